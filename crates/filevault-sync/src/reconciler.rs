//! Folder sync reconciler
//!
//! The [`Reconciler`] ties the pieces together for one directory:
//!
//! 1. **Scan** the top level of the directory ([`scan_directory`])
//! 2. **List** the server files (retried on transient errors)
//! 3. **Plan** the diff ([`plan_sync`])
//! 4. **Confirm** and **execute** ([`execute_plan`])
//!
//! Steps 1 to 3 have no side effects and are available on their own
//! through [`Reconciler::prepare`] for dry runs.
//!
//! ## Retry Logic
//!
//! Listing the server files is idempotent, so errors the remote classifies
//! as transient ([`IRemoteFiles::is_transient`]) are retried with
//! exponential backoff: 1s, 2s, 4s (max 3 retries). Uploads and deletes are
//! never retried.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::executor::{execute_plan, ActionResult, ExecutionResult};
use crate::planner::{plan_sync, ServerFile, SyncPlan};
use crate::remote::{Confirm, IRemoteFiles};
use crate::scanner::{scan_directory, ScanPolicy, ScanReport};
use crate::SyncError;

/// Message when the scan found nothing eligible
pub const MSG_NO_SUPPORTED_FILES: &str = "No supported files found in folder";
/// Message when every local file already matches the server
pub const MSG_ALL_SYNCED: &str = "All files are already synchronized";

// ============================================================================
// Retry logic
// ============================================================================

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (1 second)
const BASE_DELAY_SECS: u64 = 1;

/// Executes an async operation with exponential backoff retry
///
/// Errors `is_transient` rejects are returned immediately.
async fn with_retry<F, Fut, T>(
    operation_name: &str,
    is_transient: impl Fn(&anyhow::Error) -> bool,
    f: F,
) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt, "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if attempt < MAX_RETRIES && is_transient(&err) => {
                let delay_secs = BASE_DELAY_SECS * 2u64.pow(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_secs,
                    error = %err,
                    "Transient error, retrying"
                );
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Overall classification of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// No action failed (including runs with nothing to do)
    Success,
    /// Some actions failed, some succeeded
    Partial,
    /// Every action failed
    Failed,
    /// The plan was declined
    Cancelled,
}

/// Summary of a completed folder sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSyncResult {
    /// Valid local files considered by the plan
    pub total_files: usize,
    /// Local files rejected by the scan
    pub skipped_files: usize,
    pub new_files: usize,
    pub replaced_files: usize,
    pub unchanged_files: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub results: Vec<ActionResult>,
    pub cancelled: bool,
    pub message: Option<String>,
}

impl FolderSyncResult {
    pub fn outcome(&self) -> SyncOutcome {
        if self.cancelled {
            SyncOutcome::Cancelled
        } else if self.error_count == 0 {
            SyncOutcome::Success
        } else if self.success_count > 0 {
            SyncOutcome::Partial
        } else {
            SyncOutcome::Failed
        }
    }
}

/// Scan and plan of one directory, not yet executed
#[derive(Debug, Clone)]
pub struct PreparedSync {
    pub scan: ScanReport,
    pub plan: SyncPlan,
}

// ============================================================================
// Reconciler
// ============================================================================

/// One-directional folder synchronization against the server
pub struct Reconciler {
    remote: Arc<dyn IRemoteFiles>,
    policy: ScanPolicy,
}

impl Reconciler {
    pub fn new(remote: Arc<dyn IRemoteFiles>, policy: ScanPolicy) -> Self {
        Self { remote, policy }
    }

    /// Scans `dir` and plans against the server listing
    ///
    /// The server is only contacted when the scan found eligible files.
    pub async fn prepare(&self, dir: &Path) -> Result<PreparedSync, SyncError> {
        let scan = scan_directory(dir, &self.policy).await?;
        if scan.files.is_empty() {
            return Ok(PreparedSync {
                scan,
                plan: SyncPlan::default(),
            });
        }

        let listing = with_retry(
            "list_files",
            |e| self.remote.is_transient(e),
            || self.remote.list_files(),
        )
            .await
            .map_err(|e| SyncError::Remote(format!("{e:#}")))?;
        let server: Vec<ServerFile> = listing.iter().map(ServerFile::from).collect();

        let plan = plan_sync(&scan.files, &server);
        info!(
            new = plan.summary.new_files,
            replaced = plan.summary.replaced_files,
            unchanged = plan.summary.unchanged_files,
            "Sync plan ready"
        );
        Ok(PreparedSync { scan, plan })
    }

    /// Runs a full sync of `dir`
    #[tracing::instrument(skip(self, confirm), fields(dir = %dir.display()))]
    pub async fn sync_folder(
        &self,
        dir: &Path,
        confirm: &dyn Confirm,
    ) -> Result<FolderSyncResult, SyncError> {
        let prepared = self.prepare(dir).await?;
        let summary = prepared.plan.summary;

        let mut result = FolderSyncResult {
            total_files: summary.total_local_files,
            skipped_files: prepared.scan.skipped,
            unchanged_files: summary.unchanged_files,
            ..FolderSyncResult::default()
        };

        if prepared.scan.files.is_empty() {
            result.message = Some(MSG_NO_SUPPORTED_FILES.to_string());
            return Ok(result);
        }
        if prepared.plan.is_empty() {
            result.message = Some(MSG_ALL_SYNCED.to_string());
            return Ok(result);
        }

        let ExecutionResult {
            success_count,
            error_count,
            results,
            cancelled,
            message,
            ..
        } = execute_plan(
            &prepared.plan,
            &prepared.scan.session,
            self.remote.as_ref(),
            confirm,
        )
        .await;

        result.cancelled = cancelled;
        result.message = message;
        if !cancelled {
            result.new_files = summary.new_files;
            result.replaced_files = summary.replaced_files;
            result.success_count = success_count;
            result.error_count = error_count;
            result.results = results;
        }
        Ok(result)
    }
}
