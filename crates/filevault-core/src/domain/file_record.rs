//! File metadata records
//!
//! A [`FileRecord`] is the metadata row for one stored blob. Its `size` and
//! `content_hash` always describe the bytes currently stored for it, so both
//! change together through [`FileRecord::replace_content`].
//!
//! [`FileView`] is the public representation sent to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{ContentHash, FileId, OwnerId, StoredName};

/// MIME type used when a client does not send one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Metadata of one stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    id: FileId,
    original_name: String,
    size: u64,
    content_type: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    owner_id: OwnerId,
    content_hash: ContentHash,
}

impl FileRecord {
    /// Creates a record for freshly uploaded content
    ///
    /// `modified_at` starts equal to `created_at`. An empty or missing
    /// content type falls back to [`DEFAULT_CONTENT_TYPE`].
    pub fn new(
        id: FileId,
        owner_id: OwnerId,
        original_name: impl Into<String>,
        content_type: Option<&str>,
        size: u64,
        content_hash: ContentHash,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            original_name: original_name.into(),
            size,
            content_type: normalize_content_type(content_type),
            created_at: now,
            modified_at: now,
            owner_id,
            content_hash,
        }
    }

    /// Rebuilds a record from persisted values
    #[allow(clippy::too_many_arguments)]
    pub fn with_id(
        id: FileId,
        owner_id: OwnerId,
        original_name: String,
        content_type: String,
        size: u64,
        content_hash: ContentHash,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            original_name,
            size,
            content_type,
            created_at,
            modified_at,
            owner_id,
            content_hash,
        }
    }

    pub fn id(&self) -> &FileId {
        &self.id
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }

    /// Name of the blob backing this record
    ///
    /// Derived from the id and the original name, so it stays stable across
    /// content replacements.
    pub fn stored_name(&self) -> StoredName {
        StoredName::for_file(&self.id, &self.original_name)
    }

    /// Whether `owner` owns this record
    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        &self.owner_id == owner
    }

    /// Records new content: size, hash and modification time change together
    pub fn replace_content(&mut self, size: u64, content_hash: ContentHash) {
        self.size = size;
        self.content_hash = content_hash;
        self.modified_at = Utc::now();
    }

    /// Public representation, with the owner's username filled in
    pub fn to_view(&self, owner_username: &str) -> FileView {
        FileView {
            id: self.id,
            original_name: self.original_name.clone(),
            size: self.size,
            content_type: self.content_type.clone(),
            created_at: self.created_at,
            modified_at: self.modified_at,
            owner_username: owner_username.to_string(),
            file_hash: self.content_hash.clone(),
        }
    }
}

fn normalize_content_type(content_type: Option<&str>) -> String {
    match content_type.map(str::trim) {
        Some(ct) if !ct.is_empty() => ct.to_string(),
        _ => DEFAULT_CONTENT_TYPE.to_string(),
    }
}

/// File representation exchanged with clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    pub id: FileId,
    pub original_name: String,
    pub size: u64,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub owner_username: String,
    pub file_hash: ContentHash,
}
