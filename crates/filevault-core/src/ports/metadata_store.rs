//! Metadata store port (driven/secondary port)
//!
//! Reads go straight to the store. Writes are staged in a [`UnitOfWork`]
//! and applied by [`IMetadataStore::commit`], all or nothing. The caller
//! decides when to commit, which lets the upload saga order the metadata
//! write after the blob write.
//!
//! ## Authorization gate
//!
//! [`IMetadataStore::get_owned`] answers `None` both for an unknown id and
//! for an id that belongs to another owner. Callers must not try to tell
//! the two apart.

use crate::domain::{
    newtypes::{FileId, OwnerId},
    FileRecord, UserStats,
};

/// One staged mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataChange {
    Create(FileRecord),
    Update(FileRecord),
    Delete(FileId),
}

/// Ordered list of staged mutations, applied atomically on commit
#[derive(Debug, Clone, Default)]
pub struct UnitOfWork {
    changes: Vec<MetadataChange>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages the creation of a record
    pub fn create(&mut self, record: FileRecord) -> &mut Self {
        self.changes.push(MetadataChange::Create(record));
        self
    }

    /// Stages an update of an existing record
    pub fn update(&mut self, record: FileRecord) -> &mut Self {
        self.changes.push(MetadataChange::Update(record));
        self
    }

    /// Stages the deletion of a record
    pub fn delete(&mut self, id: FileId) -> &mut Self {
        self.changes.push(MetadataChange::Delete(id));
        self
    }

    /// Stages the deletion of several records
    pub fn delete_many<I>(&mut self, ids: I) -> &mut Self
    where
        I: IntoIterator<Item = FileId>,
    {
        self.changes
            .extend(ids.into_iter().map(MetadataChange::Delete));
        self
    }

    pub fn changes(&self) -> &[MetadataChange] {
        &self.changes
    }

    pub fn into_changes(self) -> Vec<MetadataChange> {
        self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// Port trait for file metadata persistence
#[async_trait::async_trait]
pub trait IMetadataStore: Send + Sync {
    /// Looks up a record by id regardless of owner
    async fn get(&self, id: &FileId) -> anyhow::Result<Option<FileRecord>>;

    /// Looks up a record by id, only if `owner` owns it
    async fn get_owned(&self, id: &FileId, owner: &OwnerId)
        -> anyhow::Result<Option<FileRecord>>;

    /// All records of `owner`, newest first
    async fn list_by_owner(&self, owner: &OwnerId) -> anyhow::Result<Vec<FileRecord>>;

    /// File count and total size for `owner`
    async fn owner_stats(&self, owner: &OwnerId) -> anyhow::Result<UserStats>;

    /// Applies every staged change in one transaction
    ///
    /// On error none of the changes are visible. An `Update` or `Delete`
    /// that matches no row is an error, as is a `Create` with an existing id.
    async fn commit(&self, work: UnitOfWork) -> anyhow::Result<()>;
}
