//! File commands - List, upload, download, delete and stats
//!
//! Thin wrappers over [`ApiClient`](filevault_client::ApiClient); each one
//! prints a human summary or, with `--json`, the server's data payload.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use filevault_core::domain::{format_size, newtypes::FileId};
use filevault_sync::content_type_for;

use super::CommandContext;
use crate::output::plural;

// ============================================================================
// list
// ============================================================================

#[derive(Debug, Args)]
pub struct ListCommand {}

impl ListCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let files = ctx
            .client(&config)?
            .list_files()
            .await
            .context("Failed to list files")?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&files)?);
            return Ok(());
        }

        if files.is_empty() {
            formatter.success("No files stored yet");
            return Ok(());
        }

        formatter.success(&format!("{} file{}", files.len(), plural(files.len())));
        for file in &files {
            formatter.info(&format!(
                "{}  {:>10}  {}  {}",
                file.id,
                format_size(file.size),
                file.modified_at.format("%Y-%m-%d %H:%M"),
                file.original_name
            ));
        }
        Ok(())
    }
}

// ============================================================================
// upload
// ============================================================================

#[derive(Debug, Args)]
pub struct UploadCommand {
    /// Local file to upload
    pub path: PathBuf,
}

impl UploadCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let client = ctx.client(&config)?;

        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Not a file path: {}", self.path.display()))?;
        let content = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        info!(file = %file_name, size = content.len(), "Uploading file");
        let view = client
            .upload(file_name, content_type_for(file_name), content)
            .await
            .with_context(|| format!("Failed to upload {file_name}"))?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&view)?);
        } else {
            formatter.success(&format!("Uploaded {}", view.original_name));
            formatter.info(&format!("Id:   {}", view.id));
            formatter.info(&format!("Size: {}", format_size(view.size)));
            formatter.info(&format!("Hash: {}", view.file_hash));
        }
        Ok(())
    }
}

// ============================================================================
// download
// ============================================================================

#[derive(Debug, Args)]
pub struct DownloadCommand {
    /// File id
    pub id: FileId,

    /// Destination path (defaults to the original name in the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl DownloadCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let download = ctx
            .client(&config)?
            .download(&self.id)
            .await
            .with_context(|| format!("Failed to download {}", self.id))?;

        let dest = match (&self.output, &download.file_name) {
            (Some(path), _) if path.is_dir() => path.join(
                download
                    .file_name
                    .clone()
                    .unwrap_or_else(|| self.id.to_string()),
            ),
            (Some(path), _) => path.clone(),
            (None, Some(name)) => PathBuf::from(name),
            (None, None) => PathBuf::from(self.id.to_string()),
        };

        let written = download
            .save_to(&dest)
            .await
            .with_context(|| format!("Failed to write {}", dest.display()))?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "id": self.id,
                "path": dest.display().to_string(),
                "bytes": written,
            }));
        } else {
            formatter.success(&format!(
                "Saved {} ({})",
                dest.display(),
                format_size(written)
            ));
        }
        Ok(())
    }
}

// ============================================================================
// delete
// ============================================================================

#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// One or more file ids
    #[arg(required = true)]
    pub ids: Vec<String>,
}

impl DeleteCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let client = ctx.client(&config)?;

        if let [single] = self.ids.as_slice() {
            let id: FileId = single
                .parse()
                .with_context(|| format!("Invalid file id: {single}"))?;
            client
                .delete_file(&id)
                .await
                .with_context(|| format!("Failed to delete {id}"))?;

            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({ "deleted": [id], "skipped": [] }));
            } else {
                formatter.success(&format!("Deleted {id}"));
            }
            return Ok(());
        }

        let report = client
            .delete_batch(&self.ids)
            .await
            .context("Failed to delete files")?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&report)?);
        } else {
            formatter.success(&format!(
                "Deleted {} file{}",
                report.deleted.len(),
                plural(report.deleted.len())
            ));
            for skipped in &report.skipped {
                formatter.warn(&format!(
                    "Skipped {}: {}",
                    skipped.id,
                    serde_json::to_value(skipped.reason)?
                        .as_str()
                        .unwrap_or("skipped")
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// stats
// ============================================================================

#[derive(Debug, Args)]
pub struct StatsCommand {}

impl StatsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let stats = ctx
            .client(&config)?
            .stats()
            .await
            .context("Failed to fetch statistics")?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(stats)?);
        } else {
            formatter.success("Storage usage");
            formatter.info(&format!("Files: {}", stats.total_files));
            formatter.info(&format!("Size:  {}", stats.formatted_size()));
        }
        Ok(())
    }
}
