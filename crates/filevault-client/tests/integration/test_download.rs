//! Streamed downloads

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, err};

const ID: &str = "7d7f0c1e-58d4-4c1b-9f0e-2d0a4d8f3b11";

async fn mount_download(server: &wiremock::MockServer, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{ID}/download")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.to_vec())
                .append_header("Content-Type", "text/plain")
                .append_header("Content-Disposition", "attachment; filename=\"report.txt\""),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_download_reads_headers_and_bytes() {
    let (server, client) = common::setup().await;
    mount_download(&server, b"quarterly numbers").await;

    let download = client.download(&ID.parse().unwrap()).await.expect("download failed");

    assert_eq!(download.file_name.as_deref(), Some("report.txt"));
    assert_eq!(download.content_type.as_deref(), Some("text/plain"));
    assert_eq!(download.content_length, Some(17));
    assert_eq!(download.bytes().await.unwrap(), b"quarterly numbers");
}

#[tokio::test]
async fn test_download_save_to_writes_file() {
    let (server, client) = common::setup().await;
    mount_download(&server, b"saved content").await;
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("report.txt");

    let written = client
        .download(&ID.parse().unwrap())
        .await
        .unwrap()
        .save_to(&dest)
        .await
        .expect("save_to failed");

    assert_eq!(written, 13);
    assert_eq!(std::fs::read(&dest).unwrap(), b"saved content");
    assert!(!dir.path().join("report.txt.part").exists());
}

#[tokio::test]
async fn test_download_of_missing_file() {
    let (server, client) = common::setup().await;
    Mock::given(method("GET"))
        .and(path(format!("/files/{ID}/download")))
        .respond_with(ResponseTemplate::new(404).set_body_json(err(
            "File.NotFound",
            "File not found.",
            "NotFound",
        )))
        .mount(&server)
        .await;

    let error = client.download(&ID.parse().unwrap()).await.unwrap_err();
    assert_eq!(error.code(), Some("File.NotFound"));
}
