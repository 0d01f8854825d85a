//! File service use case: the upload/update orchestrator
//!
//! Coordinates hashing, blob writes and metadata commits across two
//! independent stores. Writes are expressed as a [`Saga`]:
//!
//! | Operation | Step 1 (compensation)            | Step 2              |
//! |-----------|----------------------------------|---------------------|
//! | upload    | write blob (delete blob)         | commit create       |
//! | replace   | overwrite blob (log, no restore) | commit update       |
//!
//! The blob is always written before the metadata, so a failed blob write
//! never leaves a record behind, and a failed commit removes the new blob.
//! A replace overwrites the previous content in place, so a failed commit
//! after a successful overwrite leaves the old record pointing at new bytes.
//!
//! Every lookup by id goes through the owned-lookup gate: an id owned by
//! somebody else is reported exactly like an unknown id.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::UploadsConfig;
use crate::domain::{
    newtypes::{normalized_extension, sanitize_file_name, FileId, OwnerId, StoredName},
    FileError, FileRecord, FileView, User, UserStats,
};
use crate::hashing::hash_bytes;
use crate::ports::{BlobReader, IBlobStore, IMetadataStore, IUserDirectory, UnitOfWork};
use crate::usecases::saga::{Saga, SagaFailure, SagaStep};

// ============================================================================
// Upload policy
// ============================================================================

/// Size and type rules applied before anything touches storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    max_file_size_bytes: u64,
    allowed_types: Vec<String>,
}

impl UploadPolicy {
    /// Builds a policy; extensions are compared lowercased and without dot
    ///
    /// An empty `allowed_types` list accepts every type.
    pub fn new(max_file_size_bytes: u64, allowed_types: &[String]) -> Self {
        Self {
            max_file_size_bytes,
            allowed_types: allowed_types
                .iter()
                .map(|t| t.trim().trim_start_matches('.').to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &UploadsConfig) -> Self {
        Self::new(config.max_file_size_bytes(), &config.allowed_types)
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_bytes
    }

    /// Whether a file named `file_name` has an accepted type
    pub fn allows(&self, file_name: &str) -> bool {
        if self.allowed_types.is_empty() {
            return true;
        }
        normalized_extension(file_name)
            .map(|ext| self.allowed_types.iter().any(|t| *t == ext))
            .unwrap_or(false)
    }

    /// Checks an upload in the order: empty, size, type
    pub fn check(&self, file_name: &str, size: u64) -> Result<(), FileError> {
        if size == 0 {
            return Err(FileError::empty_file());
        }
        self.check_size(size)?;
        if !self.allows(file_name) {
            let ext = normalized_extension(file_name).unwrap_or_default();
            return Err(FileError::invalid_file_type(&ext));
        }
        Ok(())
    }

    fn check_size(&self, size: u64) -> Result<(), FileError> {
        if size > self.max_file_size_bytes {
            return Err(FileError::file_too_large(self.max_file_size_bytes));
        }
        Ok(())
    }
}

// ============================================================================
// Requests and results
// ============================================================================

/// An incoming upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Client-supplied file name; only its last path component is kept
    pub file_name: String,
    /// Client-supplied MIME type, if any
    pub content_type: Option<String>,
    /// Complete file content
    pub content: Bytes,
}

/// A blob opened for download together with its metadata
pub struct Download {
    pub file: FileView,
    pub content: BlobReader,
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download").field("file", &self.file).finish()
    }
}

/// Why an id of a batch delete was not deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not a well-formed file id
    InvalidId,
    /// Unknown, or owned by somebody else
    NotFound,
    /// Listed more than once in the request
    Duplicate,
}

/// One id of a batch delete that was left alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub id: String,
    pub reason: SkipReason,
}

/// Outcome of a batch delete, one entry per requested id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDeleteReport {
    pub deleted: Vec<FileId>,
    pub skipped: Vec<SkippedFile>,
}

// ============================================================================
// Saga steps
// ============================================================================

/// Writes a blob; compensation deletes it when the blob is new
struct WriteBlobStep<'a> {
    blobs: &'a dyn IBlobStore,
    owner: &'a OwnerId,
    name: &'a StoredName,
    content: &'a [u8],
    replaces_existing: bool,
}

#[async_trait::async_trait]
impl SagaStep for WriteBlobStep<'_> {
    fn name(&self) -> &'static str {
        if self.replaces_existing {
            "overwrite blob"
        } else {
            "write blob"
        }
    }

    async fn execute(&mut self) -> anyhow::Result<()> {
        let mut reader = self.content;
        let written = self.blobs.save(self.owner, self.name, &mut reader).await?;
        if written != self.content.len() as u64 {
            anyhow::bail!(
                "short blob write: {} of {} bytes",
                written,
                self.content.len()
            );
        }
        Ok(())
    }

    async fn compensate(&mut self) -> anyhow::Result<()> {
        if self.replaces_existing {
            // Previous bytes are gone after an in-place overwrite.
            warn!(
                owner = %self.owner,
                blob = %self.name,
                "Blob was overwritten before the metadata commit failed; previous content is not recoverable"
            );
            return Ok(());
        }
        self.blobs.delete(self.owner, self.name).await
    }
}

/// Commits a staged unit of work; nothing to undo once committed
struct CommitMetadataStep<'a> {
    metadata: &'a dyn IMetadataStore,
    work: Option<UnitOfWork>,
}

#[async_trait::async_trait]
impl SagaStep for CommitMetadataStep<'_> {
    fn name(&self) -> &'static str {
        "commit metadata"
    }

    async fn execute(&mut self) -> anyhow::Result<()> {
        let work = self
            .work
            .take()
            .ok_or_else(|| anyhow::anyhow!("unit of work already committed"))?;
        self.metadata.commit(work).await
    }

    async fn compensate(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

// ============================================================================
// FileService
// ============================================================================

/// Use case for all file operations of an authenticated owner
pub struct FileService {
    blobs: Arc<dyn IBlobStore>,
    metadata: Arc<dyn IMetadataStore>,
    users: Arc<dyn IUserDirectory>,
    policy: UploadPolicy,
}

impl FileService {
    /// Creates a new FileService with the required dependencies
    ///
    /// # Arguments
    ///
    /// * `blobs` - Storage for raw file bytes
    /// * `metadata` - Storage for file records
    /// * `users` - Owner resolution
    /// * `policy` - Size and type rules for uploads
    pub fn new(
        blobs: Arc<dyn IBlobStore>,
        metadata: Arc<dyn IMetadataStore>,
        users: Arc<dyn IUserDirectory>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            blobs,
            metadata,
            users,
            policy,
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Stores a new file for `owner`
    ///
    /// This method:
    /// 1. Validates name, emptiness, size and type
    /// 2. Resolves the owner
    /// 3. Hashes the content
    /// 4. Writes the blob under `{id}{extension}`
    /// 5. Commits the new record, deleting the blob if the commit fails
    ///
    /// # Errors
    ///
    /// `Validation` and `NotFound` before any storage access, `UploadFailed`
    /// when the blob write or the commit fails.
    #[tracing::instrument(skip(self, request), fields(owner = %owner, file_name = %request.file_name, size = request.content.len()))]
    pub async fn upload(
        &self,
        owner: &OwnerId,
        request: UploadRequest,
    ) -> Result<FileView, FileError> {
        // Step 1: Validate
        let file_name = sanitize_file_name(&request.file_name)
            .ok_or_else(|| FileError::invalid_file_name(&request.file_name))?;
        let size = request.content.len() as u64;
        self.policy.check(&file_name, size)?;

        // Step 2: Resolve owner
        let user = self.require_owner(owner).await?;

        // Step 3: Hash
        let content_hash = hash_bytes(&request.content);

        // Step 4: Allocate id and stored name
        let record = FileRecord::new(
            FileId::new(),
            *owner,
            file_name,
            request.content_type.as_deref(),
            size,
            content_hash,
        );
        let stored_name = record.stored_name();

        let mut work = UnitOfWork::new();
        work.create(record.clone());

        // Steps 5-6: Blob first, then metadata
        let saga = Saga::new("upload")
            .step(WriteBlobStep {
                blobs: self.blobs.as_ref(),
                owner,
                name: &stored_name,
                content: &request.content,
                replaces_existing: false,
            })
            .step(CommitMetadataStep {
                metadata: self.metadata.as_ref(),
                work: Some(work),
            });

        saga.run().await.map_err(upload_failed)?;

        info!(
            file_id = %record.id(),
            hash = %record.content_hash(),
            "File uploaded"
        );
        Ok(record.to_view(user.username()))
    }

    /// Replaces the content of an owned file
    ///
    /// The blob keeps its `{id}{extension}` name, the extension coming from
    /// the existing original name. The new hash is computed here.
    #[tracing::instrument(skip(self, content), fields(owner = %owner, size = content.len()))]
    pub async fn replace_content(
        &self,
        owner: &OwnerId,
        file_id: &str,
        content: Bytes,
    ) -> Result<FileView, FileError> {
        let id = parse_file_id(file_id)?;
        let user = self.require_owner(owner).await?;
        let record = self.owned_record(&id, owner).await?;

        let size = content.len() as u64;
        self.policy.check_size(size)?;

        let mut updated = record.clone();
        updated.replace_content(size, hash_bytes(&content));
        let stored_name = updated.stored_name();

        let mut work = UnitOfWork::new();
        work.update(updated.clone());

        let saga = Saga::new("replace")
            .step(WriteBlobStep {
                blobs: self.blobs.as_ref(),
                owner,
                name: &stored_name,
                content: &content,
                replaces_existing: true,
            })
            .step(CommitMetadataStep {
                metadata: self.metadata.as_ref(),
                work: Some(work),
            });

        saga.run().await.map_err(upload_failed)?;

        info!(
            file_id = %updated.id(),
            old_hash = %record.content_hash(),
            new_hash = %updated.content_hash(),
            "File content replaced"
        );
        Ok(updated.to_view(user.username()))
    }

    /// All files of `owner`, newest first
    pub async fn list_files(&self, owner: &OwnerId) -> Result<Vec<FileView>, FileError> {
        let user = self.require_owner(owner).await?;
        let records = self
            .metadata
            .list_by_owner(owner)
            .await
            .map_err(unexpected("Failed to list files"))?;

        debug!(owner = %owner, count = records.len(), "Listed files");
        Ok(records
            .iter()
            .map(|r| r.to_view(user.username()))
            .collect())
    }

    /// One owned file
    pub async fn get_file(&self, owner: &OwnerId, file_id: &str) -> Result<FileView, FileError> {
        let id = parse_file_id(file_id)?;
        let user = self.require_owner(owner).await?;
        let record = self.owned_record(&id, owner).await?;
        Ok(record.to_view(user.username()))
    }

    /// Opens an owned file for download
    ///
    /// A record whose blob is missing is reported as not found.
    pub async fn download(&self, owner: &OwnerId, file_id: &str) -> Result<Download, FileError> {
        let id = parse_file_id(file_id)?;
        let user = self.require_owner(owner).await?;
        let record = self.owned_record(&id, owner).await?;

        let content = self
            .blobs
            .get(owner, &record.stored_name())
            .await
            .map_err(unexpected("Failed to open blob"))?;

        match content {
            Some(content) => Ok(Download {
                file: record.to_view(user.username()),
                content,
            }),
            None => {
                warn!(file_id = %id, owner = %owner, "Record has no blob");
                Err(FileError::file_not_found())
            }
        }
    }

    /// Deletes one owned file: blob first (best-effort), then the record
    #[tracing::instrument(skip(self), fields(owner = %owner))]
    pub async fn delete_file(&self, owner: &OwnerId, file_id: &str) -> Result<(), FileError> {
        let id = parse_file_id(file_id)?;
        self.require_owner(owner).await?;
        let record = self.owned_record(&id, owner).await?;

        if let Err(err) = self.blobs.delete(owner, &record.stored_name()).await {
            warn!(file_id = %id, error = %format!("{err:#}"), "Failed to delete blob");
        }

        let mut work = UnitOfWork::new();
        work.delete(id);
        self.metadata
            .commit(work)
            .await
            .map_err(unexpected("Failed to delete file record"))?;

        info!(file_id = %id, "File deleted");
        Ok(())
    }

    /// Deletes every listed file that `owner` owns
    ///
    /// Malformed, unknown, foreign and duplicate ids are skipped and listed
    /// in the report. Fails with `NotFound` only when no id resolves to an
    /// owned file. Blob removal is best-effort like [`Self::delete_file`];
    /// every resolved record goes in one commit and the owner namespace is
    /// dropped once empty.
    #[tracing::instrument(skip(self, file_ids), fields(owner = %owner, requested = file_ids.len()))]
    pub async fn delete_files(
        &self,
        owner: &OwnerId,
        file_ids: &[String],
    ) -> Result<BatchDeleteReport, FileError> {
        self.require_owner(owner).await?;

        let mut report = BatchDeleteReport::default();
        let mut seen = HashSet::new();
        let mut targets: Vec<FileRecord> = Vec::new();

        // Step 1: Resolve every id through the owned-lookup gate
        for raw in file_ids {
            let skip = |reason| SkippedFile {
                id: raw.clone(),
                reason,
            };
            let Ok(id) = raw.parse::<FileId>() else {
                report.skipped.push(skip(SkipReason::InvalidId));
                continue;
            };
            if !seen.insert(id) {
                report.skipped.push(skip(SkipReason::Duplicate));
                continue;
            }
            match self
                .metadata
                .get_owned(&id, owner)
                .await
                .map_err(unexpected("Failed to look up file"))?
            {
                Some(record) => targets.push(record),
                None => report.skipped.push(skip(SkipReason::NotFound)),
            }
        }

        if targets.is_empty() {
            return Err(FileError::file_not_found());
        }

        // Step 2: Remove blobs, namespace cleanup included
        let names: Vec<StoredName> = targets.iter().map(FileRecord::stored_name).collect();
        match self.blobs.delete_many(owner, &names).await {
            Ok(failed) => {
                for name in failed {
                    warn!(stored_name = %name, "Failed to delete blob");
                }
            }
            Err(err) => warn!(error = %format!("{err:#}"), "Failed to delete blobs"),
        }

        // Step 3: Remove every resolved record in one commit
        let mut work = UnitOfWork::new();
        for record in &targets {
            work.delete(*record.id());
            report.deleted.push(*record.id());
        }
        self.metadata
            .commit(work)
            .await
            .map_err(unexpected("Failed to delete file records"))?;

        info!(
            deleted = report.deleted.len(),
            skipped = report.skipped.len(),
            "Batch delete finished"
        );
        Ok(report)
    }

    /// File count and total size of `owner`
    pub async fn stats(&self, owner: &OwnerId) -> Result<UserStats, FileError> {
        self.require_owner(owner).await?;
        self.metadata
            .owner_stats(owner)
            .await
            .map_err(unexpected("Failed to compute storage statistics"))
    }

    async fn require_owner(&self, owner: &OwnerId) -> Result<User, FileError> {
        self.users
            .find_user(owner)
            .await
            .map_err(unexpected("Failed to resolve owner"))?
            .ok_or_else(FileError::user_not_found)
    }

    async fn owned_record(&self, id: &FileId, owner: &OwnerId) -> Result<FileRecord, FileError> {
        self.metadata
            .get_owned(id, owner)
            .await
            .map_err(unexpected("Failed to look up file"))?
            .ok_or_else(FileError::file_not_found)
    }
}

fn parse_file_id(raw: &str) -> Result<FileId, FileError> {
    raw.parse::<FileId>()
        .map_err(|e| FileError::InvalidIdentifier(e.to_string()))
}

fn upload_failed(failure: SagaFailure) -> FileError {
    error!(
        saga = failure.saga,
        step = failure.step,
        compensation_errors = failure.compensation_errors.len(),
        error = %failure,
        "Write failed"
    );
    FileError::UploadFailed(failure.to_string())
}

fn unexpected(context: &'static str) -> impl FnOnce(anyhow::Error) -> FileError {
    move |err| {
        error!(error = %format!("{err:#}"), "{}", context);
        FileError::Unexpected(format!("{context}: {err:#}"))
    }
}

// ============================================================================
// Tests
// ============================================================================
