//! Ports used by the reconciler
//!
//! [`IRemoteFiles`] is the slice of the server API a sync needs; the HTTP
//! client implements it. [`Confirm`] is the user gate between planning and
//! execution; the CLI implements it with a terminal prompt.

use filevault_core::domain::{newtypes::FileId, FileView};

use crate::planner::SyncPlan;

/// Server operations needed by a sync
#[async_trait::async_trait]
pub trait IRemoteFiles: Send + Sync {
    /// Every file of the authenticated owner, newest first
    async fn list_files(&self) -> anyhow::Result<Vec<FileView>>;

    /// Uploads `content` as a new file named `file_name`
    async fn upload_file(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        content: Vec<u8>,
    ) -> anyhow::Result<FileView>;

    /// Deletes one file
    async fn delete_file(&self, id: &FileId) -> anyhow::Result<()>;

    /// Whether a failed call is worth retrying
    ///
    /// Only idempotent calls are retried. Remotes that cannot tell keep the
    /// default and nothing is retried.
    fn is_transient(&self, _err: &anyhow::Error) -> bool {
        false
    }
}

/// Asks whether a plan may be executed
#[async_trait::async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, plan: &SyncPlan) -> anyhow::Result<bool>;
}

/// Approves every plan (`--yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

#[async_trait::async_trait]
impl Confirm for AlwaysConfirm {
    async fn confirm(&self, _plan: &SyncPlan) -> anyhow::Result<bool> {
        Ok(true)
    }
}
