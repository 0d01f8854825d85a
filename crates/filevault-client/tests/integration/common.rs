//! Shared test helpers for FileVault API integration tests
//!
//! Builds envelope bodies the way the server renders them and returns an
//! ApiClient pointing at a fresh mock server.

use serde_json::{json, Value};
use wiremock::MockServer;

use filevault_client::ApiClient;
use filevault_core::hashing::hash_bytes;

pub const TOKEN: &str = "test-token";

/// Starts a mock server and a client authenticated with [`TOKEN`]
pub async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::with_base_url(TOKEN, server.uri());
    (server, client)
}

/// Success envelope around `data`
pub fn ok(data: Value) -> Value {
    json!({
        "success": true,
        "message": "Operation completed successfully",
        "data": data
    })
}

/// Failure envelope
pub fn err(code: &str, message: &str, kind: &str) -> Value {
    json!({
        "success": false,
        "error": { "code": code, "message": message, "type": kind }
    })
}

/// FileView JSON for a file holding `content`
pub fn file_json(id: &str, name: &str, content: &[u8]) -> Value {
    json!({
        "id": id,
        "originalName": name,
        "size": content.len(),
        "contentType": "text/plain",
        "createdAt": "2026-01-15T10:00:00Z",
        "modifiedAt": "2026-01-15T10:00:00Z",
        "ownerUsername": "alice",
        "fileHash": hash_bytes(content).as_str()
    })
}
