//! FileVault Sync - One-directional folder synchronization
//!
//! Provides:
//! - Scanning of the top level of a local directory
//! - Diffing local files against the server listing by name and hash
//! - Confirmation before anything is sent
//! - Sequential execution with per-file outcomes
//!
//! Files present only on the server are never touched.
//!
//! ## Modules
//!
//! - [`scanner`] - Local enumeration, validation and hashing
//! - [`planner`] - NFC-normalized diff producing a [`SyncPlan`]
//! - [`remote`] - Port to the server ([`IRemoteFiles`]) and the [`Confirm`] gate
//! - [`executor`] - Sequential plan execution
//! - [`reconciler`] - Full scan, plan, confirm and execute cycle

pub mod executor;
pub mod planner;
pub mod reconciler;
pub mod remote;
pub mod scanner;

use std::path::PathBuf;

use thiserror::Error;

pub use executor::{content_type_for, execute_plan, ActionOutcome, ActionResult, ExecutionResult};
pub use planner::{plan_sync, ServerFile, SyncAction, SyncActionKind, SyncPlan, SyncSummary};
pub use reconciler::{FolderSyncResult, PreparedSync, Reconciler, SyncOutcome};
pub use remote::{AlwaysConfirm, Confirm, IRemoteFiles};
pub use scanner::{scan_directory, LocalFile, ScanPolicy, ScanReport, SyncSession};

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred while reading the sync directory
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The specified path is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The server listing could not be fetched
    #[error("Server error: {0}")]
    Remote(String),
}
