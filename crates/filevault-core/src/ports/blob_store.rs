//! Blob store port (driven/secondary port)
//!
//! Raw file bytes live in one namespace per owner, addressed by
//! [`StoredName`]. Implementations decide the backing medium.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific.
//! - `save` must never leave a partially written blob visible under its
//!   final name; on error nothing observable has changed for that name
//!   (except that an existing blob may have been kept).
//! - "Not found" is a normal outcome: `get` returns `None` and `delete` is
//!   a no-op, neither is an error.

use tokio::io::AsyncRead;

use crate::domain::newtypes::{OwnerId, StoredName};

/// Readable blob content positioned at offset 0
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Port trait for blob persistence
#[async_trait::async_trait]
pub trait IBlobStore: Send + Sync {
    /// Writes `content` fully to `{owner}/{name}`, replacing any existing blob
    ///
    /// Creates the owner namespace when absent. Returns the number of bytes
    /// written.
    async fn save(
        &self,
        owner: &OwnerId,
        name: &StoredName,
        content: &mut (dyn AsyncRead + Send + Unpin),
    ) -> anyhow::Result<u64>;

    /// Opens a blob for reading, or `None` when it does not exist
    async fn get(&self, owner: &OwnerId, name: &StoredName) -> anyhow::Result<Option<BlobReader>>;

    /// Whether a blob exists
    async fn exists(&self, owner: &OwnerId, name: &StoredName) -> anyhow::Result<bool>;

    /// Removes a blob; absent blobs are not an error
    async fn delete(&self, owner: &OwnerId, name: &StoredName) -> anyhow::Result<()>;

    /// Removes several blobs independently, then drops the owner namespace
    /// if it is left empty
    ///
    /// One failing removal does not stop the others. Returns the names that
    /// could not be removed (absent blobs count as removed).
    async fn delete_many(
        &self,
        owner: &OwnerId,
        names: &[StoredName],
    ) -> anyhow::Result<Vec<StoredName>>;
}
