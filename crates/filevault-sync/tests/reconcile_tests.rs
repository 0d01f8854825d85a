//! End-to-end tests for the Reconciler against an in-memory server
//!
//! Each test builds a temporary directory and a fake remote seeded with
//! server files, then runs a full sync.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use filevault_core::domain::{
    newtypes::{FileId, OwnerId},
    FileRecord, FileView,
};
use filevault_core::hashing::hash_bytes;
use filevault_sync::{
    ActionOutcome, AlwaysConfirm, Confirm, IRemoteFiles, Reconciler, ScanPolicy, SyncActionKind,
    SyncOutcome, SyncPlan,
};

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct FakeRemote {
    files: Mutex<Vec<FileView>>,
    calls: Mutex<Vec<String>>,
    fail_uploads: Mutex<HashSet<String>>,
    fail_deletes: Mutex<HashSet<FileId>>,
    fail_listing: Mutex<bool>,
    content_types: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeRemote {
    fn seed(&self, name: &str, content: &[u8]) -> FileId {
        let view = FileRecord::new(
            FileId::new(),
            OwnerId::new(),
            name,
            None,
            content.len() as u64,
            hash_bytes(content),
        )
        .to_view("alice");
        let id = view.id;
        self.files.lock().unwrap().push(view);
        id
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|f| f.original_name.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait::async_trait]
impl IRemoteFiles for FakeRemote {
    async fn list_files(&self) -> anyhow::Result<Vec<FileView>> {
        if *self.fail_listing.lock().unwrap() {
            anyhow::bail!("401 Unauthorized");
        }
        self.calls.lock().unwrap().push("list".to_string());
        Ok(self.files.lock().unwrap().clone())
    }

    async fn upload_file(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        content: Vec<u8>,
    ) -> anyhow::Result<FileView> {
        self.calls.lock().unwrap().push(format!("upload:{file_name}"));
        self.content_types
            .lock()
            .unwrap()
            .push((file_name.to_string(), content_type.map(str::to_string)));
        if self.fail_uploads.lock().unwrap().contains(file_name) {
            anyhow::bail!("File.InvalidFileSize: too large");
        }
        let view = FileRecord::new(
            FileId::new(),
            OwnerId::new(),
            file_name,
            content_type,
            content.len() as u64,
            hash_bytes(&content),
        )
        .to_view("alice");
        self.files.lock().unwrap().push(view.clone());
        Ok(view)
    }

    async fn delete_file(&self, id: &FileId) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(format!("delete:{id}"));
        if self.fail_deletes.lock().unwrap().contains(id) {
            anyhow::bail!("File.NotFound");
        }
        self.files.lock().unwrap().retain(|f| f.id != *id);
        Ok(())
    }
}

struct Decline;

#[async_trait::async_trait]
impl Confirm for Decline {
    async fn confirm(&self, _plan: &SyncPlan) -> anyhow::Result<bool> {
        Ok(false)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn write(dir: &Path, name: &str, content: &[u8]) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn reconciler(remote: &Arc<FakeRemote>) -> Reconciler {
    let policy = ScanPolicy::new(1024, &["txt".to_string(), "md".to_string()]);
    Reconciler::new(remote.clone(), policy)
}

/// Local {unchanged, new, changed}; server {unchanged (same), changed (old)}
fn scenario() -> (TempDir, Arc<FakeRemote>, FileId) {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "unchanged.txt", b"same bytes");
    write(dir.path(), "new.txt", b"brand new");
    write(dir.path(), "changed.txt", b"version 2");

    let remote = Arc::new(FakeRemote::default());
    remote.seed("unchanged.txt", b"same bytes");
    let changed_id = remote.seed("changed.txt", b"version 1");
    (dir, remote, changed_id)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_prepare_plans_upload_and_replace() {
    let (dir, remote, changed_id) = scenario();

    let prepared = reconciler(&remote).prepare(dir.path()).await.unwrap();

    let mut actions: Vec<_> = prepared
        .plan
        .actions
        .iter()
        .map(|a| (a.file_name.clone(), a.kind, a.server_file_id))
        .collect();
    actions.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        actions,
        vec![
            ("changed.txt".to_string(), SyncActionKind::Replace, Some(changed_id)),
            ("new.txt".to_string(), SyncActionKind::Upload, None),
        ]
    );
    assert_eq!(prepared.plan.summary.total_local_files, 3);
    assert_eq!(prepared.plan.summary.new_files, 1);
    assert_eq!(prepared.plan.summary.replaced_files, 1);
    assert_eq!(prepared.plan.summary.unchanged_files, 1);

    // Preparing never writes
    assert_eq!(remote.calls(), vec!["list"]);
}

#[tokio::test]
async fn test_full_sync_scenario() {
    let (dir, remote, changed_id) = scenario();

    let result = reconciler(&remote)
        .sync_folder(dir.path(), &AlwaysConfirm)
        .await
        .unwrap();

    assert_eq!(result.total_files, 3);
    assert_eq!(result.new_files, 1);
    assert_eq!(result.replaced_files, 1);
    assert_eq!(result.unchanged_files, 1);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.error_count, 0);
    assert_eq!(result.outcome(), SyncOutcome::Success);

    // The replace deletes the old id before uploading
    let calls = remote.calls();
    let delete_at = calls
        .iter()
        .position(|c| *c == format!("delete:{changed_id}"))
        .unwrap();
    let upload_at = calls.iter().position(|c| c == "upload:changed.txt").unwrap();
    assert!(delete_at < upload_at);

    assert_eq!(remote.names(), vec!["changed.txt", "new.txt", "unchanged.txt"]);
}

#[tokio::test]
async fn test_second_sync_is_a_no_op() {
    let (dir, remote, _) = scenario();
    let reconciler = reconciler(&remote);
    reconciler
        .sync_folder(dir.path(), &AlwaysConfirm)
        .await
        .unwrap();

    let again = reconciler
        .sync_folder(dir.path(), &AlwaysConfirm)
        .await
        .unwrap();

    assert_eq!(again.unchanged_files, 3);
    assert!(again.results.is_empty());
    assert_eq!(again.message.as_deref(), Some("All files are already synchronized"));
}

#[tokio::test]
async fn test_uploads_carry_guessed_content_type() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "notes.md", b"# notes");
    write(dir.path(), "plain.txt", b"text");
    let remote = Arc::new(FakeRemote::default());

    reconciler(&remote)
        .sync_folder(dir.path(), &AlwaysConfirm)
        .await
        .unwrap();

    let mut sent = remote.content_types.lock().unwrap().clone();
    sent.sort();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "notes.md");
    assert!(sent[0].1.as_deref().is_some_and(|t| t.starts_with("text/")));
    assert_eq!(sent[1], ("plain.txt".to_string(), Some("text/plain".to_string())));
    let stored: Vec<_> = remote
        .files
        .lock()
        .unwrap()
        .iter()
        .map(|f| f.content_type.clone())
        .collect();
    assert!(!stored.iter().any(|t| t == "application/octet-stream"));
}

#[tokio::test]
async fn test_padded_name_is_skipped_not_reuploaded() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), " padded.txt", b"same");
    write(dir.path(), "kept.txt", b"kept");
    let remote = Arc::new(FakeRemote::default());
    remote.seed("padded.txt", b"same");
    let reconciler = reconciler(&remote);

    let first = reconciler
        .sync_folder(dir.path(), &AlwaysConfirm)
        .await
        .unwrap();
    assert_eq!(first.skipped_files, 1);
    assert_eq!(first.new_files, 1);

    let second = reconciler
        .sync_folder(dir.path(), &AlwaysConfirm)
        .await
        .unwrap();
    assert!(second.results.is_empty());
    assert_eq!(remote.names(), vec!["kept.txt", "padded.txt"]);
}

#[tokio::test]
async fn test_failed_replace_upload_does_not_block_others() {
    let (dir, remote, changed_id) = scenario();
    remote
        .fail_uploads
        .lock()
        .unwrap()
        .insert("changed.txt".to_string());

    let result = reconciler(&remote)
        .sync_folder(dir.path(), &AlwaysConfirm)
        .await
        .unwrap();

    assert_eq!(result.success_count, 1);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.outcome(), SyncOutcome::Partial);

    let changed = result
        .results
        .iter()
        .find(|r| r.file_name == "changed.txt")
        .unwrap();
    assert_eq!(changed.action, ActionOutcome::ReplaceUploadFailed);
    assert!(!changed.success);

    let new = result.results.iter().find(|r| r.file_name == "new.txt").unwrap();
    assert_eq!(new.action, ActionOutcome::Uploaded);

    // Known gap: the old server copy is gone as well
    assert!(!remote.files.lock().unwrap().iter().any(|f| f.id == changed_id));
}

#[tokio::test]
async fn test_failed_delete_skips_upload() {
    let (dir, remote, changed_id) = scenario();
    remote.fail_deletes.lock().unwrap().insert(changed_id);

    let result = reconciler(&remote)
        .sync_folder(dir.path(), &AlwaysConfirm)
        .await
        .unwrap();

    let changed = result
        .results
        .iter()
        .find(|r| r.file_name == "changed.txt")
        .unwrap();
    assert_eq!(changed.action, ActionOutcome::ReplaceDeleteFailed);
    assert!(!remote.calls().contains(&"upload:changed.txt".to_string()));
}

#[tokio::test]
async fn test_declined_plan_sends_nothing() {
    let (dir, remote, _) = scenario();

    let result = reconciler(&remote)
        .sync_folder(dir.path(), &Decline)
        .await
        .unwrap();

    assert!(result.cancelled);
    assert_eq!(result.outcome(), SyncOutcome::Cancelled);
    assert_eq!(result.success_count + result.error_count, 0);
    assert_eq!(remote.calls(), vec!["list"]);
}

#[tokio::test]
async fn test_no_supported_files_skips_server() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "binary.exe", b"MZ");
    let remote = Arc::new(FakeRemote::default());

    let result = reconciler(&remote)
        .sync_folder(dir.path(), &AlwaysConfirm)
        .await
        .unwrap();

    assert_eq!(result.total_files, 0);
    assert_eq!(result.skipped_files, 1);
    assert_eq!(result.message.as_deref(), Some("No supported files found in folder"));
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn test_listing_failure_is_an_error() {
    let (dir, remote, _) = scenario();
    *remote.fail_listing.lock().unwrap() = true;

    let err = reconciler(&remote)
        .sync_folder(dir.path(), &AlwaysConfirm)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("401"));
}
