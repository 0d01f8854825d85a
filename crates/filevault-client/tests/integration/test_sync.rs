//! Folder sync against a mocked server

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

use filevault_sync::{ActionOutcome, AlwaysConfirm, Reconciler, ScanPolicy, SyncOutcome};

use crate::common::{self, err, file_json, ok};

const UNCHANGED_ID: &str = "11111111-1111-4111-8111-111111111111";
const CHANGED_ID: &str = "22222222-2222-4222-8222-222222222222";
const NEW_UPLOAD_ID: &str = "33333333-3333-4333-8333-333333333333";
const REPLACED_UPLOAD_ID: &str = "44444444-4444-4444-8444-444444444444";

fn local_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("unchanged.txt"), b"same bytes").unwrap();
    std::fs::write(dir.path().join("new.txt"), b"brand new").unwrap();
    std::fs::write(dir.path().join("changed.txt"), b"version 2").unwrap();
    dir
}

fn policy() -> ScanPolicy {
    ScanPolicy::new(1024 * 1024, &["txt".to_string()])
}

async fn mount_listing(server: &wiremock::MockServer) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!([
            file_json(CHANGED_ID, "changed.txt", b"version 1"),
            file_json(UNCHANGED_ID, "unchanged.txt", b"same bytes"),
        ]))))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sync_uploads_new_and_replaces_changed() {
    let (server, client) = common::setup().await;
    mount_listing(&server).await;

    Mock::given(method("DELETE"))
        .and(path(format!("/files/{CHANGED_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!(null))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/upload"))
        .and(body_string_contains("filename=\"new.txt\""))
        .and(body_string_contains("Content-Type: text/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(file_json(
            NEW_UPLOAD_ID,
            "new.txt",
            b"brand new",
        ))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/upload"))
        .and(body_string_contains("filename=\"changed.txt\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(file_json(
            REPLACED_UPLOAD_ID,
            "changed.txt",
            b"version 2",
        ))))
        .expect(1)
        .mount(&server)
        .await;

    let dir = local_dir();
    let reconciler = Reconciler::new(Arc::new(client), policy());
    let result = reconciler
        .sync_folder(dir.path(), &AlwaysConfirm)
        .await
        .expect("sync failed");

    assert_eq!(result.total_files, 3);
    assert_eq!(result.new_files, 1);
    assert_eq!(result.replaced_files, 1);
    assert_eq!(result.unchanged_files, 1);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.error_count, 0);
    assert_eq!(result.outcome(), SyncOutcome::Success);

    let replaced = result
        .results
        .iter()
        .find(|r| r.file_name == "changed.txt")
        .unwrap();
    assert_eq!(replaced.action, ActionOutcome::Replaced);
    assert_eq!(replaced.file_id, Some(REPLACED_UPLOAD_ID.parse().unwrap()));
}

#[tokio::test]
async fn test_sync_reports_rejected_upload() {
    let (server, client) = common::setup().await;
    mount_listing(&server).await;

    Mock::given(method("DELETE"))
        .and(path(format!("/files/{CHANGED_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!(null))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/upload"))
        .and(body_string_contains("filename=\"changed.txt\""))
        .respond_with(ResponseTemplate::new(400).set_body_json(err(
            "File.InvalidFileSize",
            "The file exceeds the maximum allowed size of 1 B.",
            "Validation",
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/upload"))
        .and(body_string_contains("filename=\"new.txt\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(file_json(
            NEW_UPLOAD_ID,
            "new.txt",
            b"brand new",
        ))))
        .mount(&server)
        .await;

    let dir = local_dir();
    let result = Reconciler::new(Arc::new(client), policy())
        .sync_folder(dir.path(), &AlwaysConfirm)
        .await
        .expect("sync failed");

    assert_eq!(result.success_count, 1);
    assert_eq!(result.error_count, 1);
    assert_eq!(result.outcome(), SyncOutcome::Partial);

    let failed = result
        .results
        .iter()
        .find(|r| r.file_name == "changed.txt")
        .unwrap();
    assert_eq!(failed.action, ActionOutcome::ReplaceUploadFailed);
    assert!(failed
        .error
        .as_deref()
        .unwrap()
        .contains("File.InvalidFileSize"));
}

#[tokio::test]
async fn test_sync_retries_listing_after_server_error() {
    let (server, client) = common::setup().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!([
            file_json(UNCHANGED_ID, "unchanged.txt", b"same bytes"),
        ]))))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("unchanged.txt"), b"same bytes").unwrap();

    let prepared = Reconciler::new(Arc::new(client), policy())
        .prepare(dir.path())
        .await
        .expect("prepare failed");

    assert!(prepared.plan.is_empty());
    assert_eq!(prepared.plan.summary.unchanged_files, 1);
}

#[tokio::test]
async fn test_sync_does_not_retry_unauthorized_listing() {
    let (server, client) = common::setup().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401).set_body_json(err(
            "Auth.Unauthorized",
            "Missing or invalid token",
            "Unauthorized",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"a").unwrap();

    let result = Reconciler::new(Arc::new(client), policy())
        .prepare(dir.path())
        .await;

    assert!(result.is_err());
}
