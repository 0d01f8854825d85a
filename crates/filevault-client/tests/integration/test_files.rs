//! File metadata and mutation routes

use filevault_client::ClientError;
use filevault_core::domain::newtypes::FileId;
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{bearer_token, body_json, body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, err, file_json, ok, TOKEN};

const ID_1: &str = "7d7f0c1e-58d4-4c1b-9f0e-2d0a4d8f3b11";
const ID_2: &str = "0b2c7a51-6a2e-4d1c-8b7f-5f7e0c6d9a22";

#[tokio::test]
async fn test_list_files_unwraps_envelope_and_sends_token() {
    let (server, client) = common::setup().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(bearer_token(TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!([
            file_json(ID_1, "b.txt", b"bbb"),
            file_json(ID_2, "a.txt", b"a"),
        ]))))
        .expect(1)
        .mount(&server)
        .await;

    let files = client.list_files().await.expect("list_files failed");

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].original_name, "b.txt");
    assert_eq!(files[0].size, 3);
    assert_eq!(files[1].id, ID_2.parse::<FileId>().unwrap());
}

#[tokio::test]
async fn test_get_file_not_found_maps_to_api_error() {
    let (server, client) = common::setup().await;
    Mock::given(method("GET"))
        .and(path(format!("/files/{ID_1}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(err(
            "File.NotFound",
            "File not found.",
            "NotFound",
        )))
        .mount(&server)
        .await;

    let error = client
        .get_file(&ID_1.parse().unwrap())
        .await
        .unwrap_err();

    match error {
        ClientError::Api {
            status,
            code,
            message,
        } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(code, "File.NotFound");
            assert_eq!(message, "File not found.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_response() {
    let (server, client) = common::setup().await;
    Mock::given(method("GET"))
        .and(path("/files/stats"))
        .respond_with(ResponseTemplate::new(401).set_body_json(err(
            "Auth.Unauthorized",
            "Authentication required.",
            "Unauthorized",
        )))
        .mount(&server)
        .await;

    let error = client.stats().await.unwrap_err();
    assert_eq!(error.code(), Some("Auth.Unauthorized"));
    assert_eq!(error.status(), Some(StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn test_error_without_envelope_keeps_status() {
    let (server, client) = common::setup().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let error = client.list_files().await.unwrap_err();
    assert_eq!(error.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    assert!(error.to_string().contains("503"));
}

#[tokio::test]
async fn test_success_with_unexpected_body_is_decode_error() {
    let (server, client) = common::setup().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let error = client.list_files().await.unwrap_err();
    assert!(matches!(error, ClientError::Decode(_)));
}

#[tokio::test]
async fn test_upload_sends_multipart_file_field() {
    let (server, client) = common::setup().await;
    Mock::given(method("POST"))
        .and(path("/files/upload"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"notes.txt\""))
        .and(body_string_contains("hello world"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(ok(file_json(ID_1, "notes.txt", b"hello world"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let view = client
        .upload("notes.txt", Some("text/plain"), b"hello world".to_vec())
        .await
        .expect("upload failed");

    assert_eq!(view.original_name, "notes.txt");
    assert_eq!(view.size, 11);
}

#[tokio::test]
async fn test_upload_validation_error() {
    let (server, client) = common::setup().await;
    Mock::given(method("POST"))
        .and(path("/files/upload"))
        .respond_with(ResponseTemplate::new(400).set_body_json(err(
            "File.InvalidFileType",
            "File type '.exe' is not allowed.",
            "Validation",
        )))
        .mount(&server)
        .await;

    let error = client
        .upload("tool.exe", None, b"MZ".to_vec())
        .await
        .unwrap_err();
    assert_eq!(error.code(), Some("File.InvalidFileType"));
}

#[tokio::test]
async fn test_update_content_sends_json_body() {
    let (server, client) = common::setup().await;
    Mock::given(method("PUT"))
        .and(path(format!("/files/{ID_1}")))
        .and(body_json(json!({ "content": "new text" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(file_json(ID_1, "a.txt", b"new text"))))
        .expect(1)
        .mount(&server)
        .await;

    let view = client
        .update_content(&ID_1.parse().unwrap(), "new text")
        .await
        .expect("update_content failed");
    assert_eq!(view.size, 8);
}

#[tokio::test]
async fn test_delete_file_accepts_null_data() {
    let (server, client) = common::setup().await;
    Mock::given(method("DELETE"))
        .and(path(format!("/files/{ID_1}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "File deleted",
            "data": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .delete_file(&ID_1.parse().unwrap())
        .await
        .expect("delete_file failed");
}

#[tokio::test]
async fn test_delete_batch_returns_report() {
    let (server, client) = common::setup().await;
    Mock::given(method("POST"))
        .and(path("/files/delete-batch"))
        .and(body_json(json!({ "fileIds": [ID_1, "not-a-uuid"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!({
            "deleted": [ID_1],
            "skipped": [{ "id": "not-a-uuid", "reason": "invalid_id" }]
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let report = client
        .delete_batch(&[ID_1.to_string(), "not-a-uuid".to_string()])
        .await
        .expect("delete_batch failed");

    assert_eq!(report.deleted, vec![ID_1.parse::<FileId>().unwrap()]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].id, "not-a-uuid");
}

#[tokio::test]
async fn test_stats() {
    let (server, client) = common::setup().await;
    Mock::given(method("GET"))
        .and(path("/files/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!({
            "totalFiles": 3,
            "totalSizeBytes": 2048
        }))))
        .mount(&server)
        .await;

    let stats = client.stats().await.expect("stats failed");
    assert_eq!(stats.total_files, 3);
    assert_eq!(stats.total_size_bytes, 2048);
}
