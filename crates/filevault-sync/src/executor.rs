//! Plan execution
//!
//! Runs after the [`Confirm`] gate approves, one action at a time and in
//! plan order. Each action is independent: a failure is recorded in its
//! [`ActionResult`] and execution moves on to the next action.
//!
//! A replace deletes the server copy before uploading the new bytes (the
//! server has no in-place update for synced files). The local bytes are
//! read before the delete, so an unreadable file never costs the server
//! copy; an upload failing after the delete still leaves neither version
//! on the server.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use filevault_core::domain::newtypes::FileId;

use crate::planner::{SyncAction, SyncActionKind, SyncPlan};
use crate::remote::{Confirm, IRemoteFiles};
use crate::scanner::SyncSession;

/// Message of a result whose plan was declined
pub const MSG_CANCELLED: &str = "Synchronization cancelled by user";

/// What happened to one action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Uploaded,
    UploadFailed,
    Replaced,
    ReplaceDeleteFailed,
    ReplaceUploadFailed,
    /// The action could not start (local file missing or unreadable)
    Error,
}

impl ActionOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, ActionOutcome::Uploaded | ActionOutcome::Replaced)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionOutcome::Uploaded => "uploaded",
            ActionOutcome::UploadFailed => "upload_failed",
            ActionOutcome::Replaced => "replaced",
            ActionOutcome::ReplaceDeleteFailed => "replace_delete_failed",
            ActionOutcome::ReplaceUploadFailed => "replace_upload_failed",
            ActionOutcome::Error => "error",
        }
    }
}

impl std::fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub file_name: String,
    pub action: ActionOutcome,
    pub success: bool,
    /// Id of the uploaded file on success
    pub file_id: Option<FileId>,
    /// Failure detail
    pub error: Option<String>,
}

impl ActionResult {
    fn ok(file_name: &str, action: ActionOutcome, file_id: FileId) -> Self {
        Self {
            file_name: file_name.to_string(),
            action,
            success: true,
            file_id: Some(file_id),
            error: None,
        }
    }

    fn failed(file_name: &str, action: ActionOutcome, error: impl Into<String>) -> Self {
        Self {
            file_name: file_name.to_string(),
            action,
            success: false,
            file_id: None,
            error: Some(error.into()),
        }
    }
}

/// Aggregate of one execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub total: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub results: Vec<ActionResult>,
    pub cancelled: bool,
    pub message: Option<String>,
}

impl ExecutionResult {
    fn cancelled() -> Self {
        Self {
            cancelled: true,
            message: Some(MSG_CANCELLED.to_string()),
            ..Self::default()
        }
    }
}

/// Asks for confirmation, then executes every action of `plan`
#[instrument(skip_all, fields(actions = plan.actions.len()))]
pub async fn execute_plan(
    plan: &SyncPlan,
    session: &SyncSession,
    remote: &dyn IRemoteFiles,
    confirm: &dyn Confirm,
) -> ExecutionResult {
    match confirm.confirm(plan).await {
        Ok(true) => {}
        Ok(false) => {
            info!("Sync plan declined");
            return ExecutionResult::cancelled();
        }
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Confirmation failed, treating as declined");
            return ExecutionResult::cancelled();
        }
    }

    let mut result = ExecutionResult {
        total: plan.actions.len(),
        ..ExecutionResult::default()
    };

    for action in &plan.actions {
        let outcome = execute_action(action, session, remote).await;
        if outcome.success {
            result.success_count += 1;
        } else {
            result.error_count += 1;
        }
        result.results.push(outcome);
    }

    info!(
        total = result.total,
        success = result.success_count,
        errors = result.error_count,
        "Sync plan executed"
    );
    result
}

/// MIME type sent with an upload of `file_name`
///
/// `None` for unknown extensions; the server then stores
/// `application/octet-stream`.
pub fn content_type_for(file_name: &str) -> Option<&'static str> {
    mime_guess::from_path(file_name).first_raw()
}

async fn execute_action(
    action: &SyncAction,
    session: &SyncSession,
    remote: &dyn IRemoteFiles,
) -> ActionResult {
    let name = action.file_name.as_str();

    let Some(path) = session.path_for(name) else {
        warn!(file = %name, "Local file missing from sync session");
        return ActionResult::failed(name, ActionOutcome::Error, "Local file not found");
    };
    let content = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(file = %name, error = %e, "Failed to read local file");
            return ActionResult::failed(name, ActionOutcome::Error, e.to_string());
        }
    };

    let content_type = content_type_for(name);

    match (action.kind, action.server_file_id) {
        (SyncActionKind::Replace, Some(target)) => {
            if let Err(e) = remote.delete_file(&target).await {
                warn!(file = %name, target = %target, error = %format!("{e:#}"), "Delete before replace failed");
                return ActionResult::failed(
                    name,
                    ActionOutcome::ReplaceDeleteFailed,
                    format!("{e:#}"),
                );
            }
            debug!(file = %name, target = %target, "Old version deleted");

            match remote.upload_file(name, content_type, content).await {
                Ok(view) => ActionResult::ok(name, ActionOutcome::Replaced, view.id),
                Err(e) => {
                    warn!(file = %name, error = %format!("{e:#}"), "Upload after delete failed");
                    ActionResult::failed(name, ActionOutcome::ReplaceUploadFailed, format!("{e:#}"))
                }
            }
        }
        (SyncActionKind::Replace, None) => {
            ActionResult::failed(name, ActionOutcome::Error, "Replace without target id")
        }
        (SyncActionKind::Upload, _) => match remote.upload_file(name, content_type, content).await {
            Ok(view) => ActionResult::ok(name, ActionOutcome::Uploaded, view.id),
            Err(e) => {
                warn!(file = %name, error = %format!("{e:#}"), "Upload failed");
                ActionResult::failed(name, ActionOutcome::UploadFailed, format!("{e:#}"))
            }
        },
    }
}
