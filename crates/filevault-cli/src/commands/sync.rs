//! Sync command - Push a local folder to the server
//!
//! Provides the `filevault sync <dir>` CLI command which:
//! 1. Loads configuration and builds the API client
//! 2. Scans the top level of the folder and lists the server files
//! 3. Shows the plan and asks for confirmation (skipped with `--yes`)
//! 4. Uploads new files, replaces changed ones, and prints the results
//!
//! `--dry-run` stops after step 2 and only prints the plan.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use filevault_sync::{
    AlwaysConfirm, Confirm, FolderSyncResult, Reconciler, ScanPolicy, SyncActionKind, SyncOutcome,
    SyncPlan,
};

use super::CommandContext;
use crate::output::{plural, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Folder whose top-level files are synchronized
    pub dir: PathBuf,

    /// Execute the plan without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let client = ctx.client(&config)?;

        let policy = ScanPolicy::from_config(&config.client);
        let reconciler = Reconciler::new(Arc::new(client), policy);

        info!(dir = %self.dir.display(), server = %config.client.server_url, "Starting folder sync");

        if self.dry_run {
            let prepared = reconciler
                .prepare(&self.dir)
                .await
                .with_context(|| format!("Failed to plan sync of {}", self.dir.display()))?;

            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "dryRun": true,
                    "totalFiles": prepared.scan.total_files,
                    "skippedFiles": prepared.scan.skipped,
                    "summary": prepared.plan.summary,
                    "actions": prepared.plan.actions,
                }));
            } else {
                formatter.info("Dry run mode - no changes will be made");
                print_plan(&*formatter, &prepared.plan);
                if prepared.scan.skipped > 0 {
                    formatter.info(&format!(
                        "Skipped:   {} file{} (type, size or unreadable)",
                        prepared.scan.skipped,
                        plural(prepared.scan.skipped)
                    ));
                }
            }
            return Ok(());
        }

        let result = if self.yes || ctx.is_json() {
            reconciler.sync_folder(&self.dir, &AlwaysConfirm).await
        } else {
            reconciler.sync_folder(&self.dir, &PromptConfirm).await
        }
        .with_context(|| format!("Failed to sync {}", self.dir.display()))?;

        if ctx.is_json() {
            let mut json = serde_json::to_value(&result).context("Failed to serialize result")?;
            json["outcome"] = serde_json::to_value(result.outcome())?;
            formatter.print_json(&json);
        } else {
            print_result(&*formatter, &result);
        }

        match result.outcome() {
            SyncOutcome::Partial | SyncOutcome::Failed => anyhow::bail!(
                "{} of {} action{} failed",
                result.error_count,
                result.success_count + result.error_count,
                plural(result.success_count + result.error_count)
            ),
            SyncOutcome::Success | SyncOutcome::Cancelled => Ok(()),
        }
    }
}

// ============================================================================
// Confirmation prompt
// ============================================================================

/// Prints the plan and reads `y`/`yes` from stdin
struct PromptConfirm;

#[async_trait::async_trait]
impl Confirm for PromptConfirm {
    async fn confirm(&self, plan: &SyncPlan) -> Result<bool> {
        let formatter = crate::output::HumanFormatter;
        print_plan(&formatter, plan);

        let answer = tokio::task::spawn_blocking(|| -> std::io::Result<String> {
            print!("Proceed? [y/N] ");
            std::io::stdout().flush()?;
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            Ok(line)
        })
        .await
        .context("Prompt task failed")?
        .context("Failed to read confirmation")?;

        Ok(is_yes(&answer))
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

// ============================================================================
// Rendering
// ============================================================================

fn print_plan(formatter: &dyn OutputFormatter, plan: &SyncPlan) {
    let summary = plan.summary;
    formatter.success(&format!(
        "Sync plan for {} local file{}",
        summary.total_local_files,
        plural(summary.total_local_files)
    ));
    formatter.info(&format!("New:       {}", summary.new_files));
    formatter.info(&format!("Changed:   {}", summary.replaced_files));
    formatter.info(&format!("Unchanged: {}", summary.unchanged_files));

    for action in &plan.actions {
        let verb = match action.kind {
            SyncActionKind::Upload => "upload ",
            SyncActionKind::Replace => "replace",
        };
        formatter.info(&format!(
            "  {} {} ({})",
            verb, action.file_name, action.reason
        ));
    }
}

fn print_result(formatter: &dyn OutputFormatter, result: &FolderSyncResult) {
    if let Some(message) = &result.message {
        match result.outcome() {
            SyncOutcome::Cancelled => formatter.warn(message),
            _ => formatter.success(message),
        }
    }
    if result.cancelled || result.results.is_empty() {
        if result.skipped_files > 0 {
            formatter.info(&format!(
                "Skipped: {} file{}",
                result.skipped_files,
                plural(result.skipped_files)
            ));
        }
        return;
    }

    match result.outcome() {
        SyncOutcome::Success => formatter.success(&format!(
            "Synchronized {} file{}",
            result.success_count,
            plural(result.success_count)
        )),
        _ => formatter.error(&format!(
            "{} error{} occurred:",
            result.error_count,
            plural(result.error_count)
        )),
    }

    formatter.info(&format!("Uploaded:  {}", result.new_files));
    formatter.info(&format!("Replaced:  {}", result.replaced_files));
    formatter.info(&format!("Unchanged: {}", result.unchanged_files));
    if result.skipped_files > 0 {
        formatter.info(&format!("Skipped:   {}", result.skipped_files));
    }

    for action in result.results.iter().filter(|r| !r.success) {
        formatter.info(&format!(
            "  - {} [{}]: {}",
            action.file_name,
            action.action,
            action.error.as_deref().unwrap_or("unknown error")
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }
}
