//! FileVault HTTP API client
//!
//! Every route answers with the same JSON envelope:
//!
//! ```json
//! { "success": true,  "message": "...", "data": { ... } }
//! { "success": false, "error": { "code": "File.NotFound", "message": "...", "type": "NotFound" } }
//! ```
//!
//! [`ApiClient`] unwraps the envelope, returning the `data` payload on success
//! and a [`ClientError::Api`] carrying the stable error code otherwise. The
//! download route is the exception: it streams raw bytes.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use filevault_client::ApiClient;
//!
//! # async fn example() -> Result<(), filevault_client::ClientError> {
//! let client = ApiClient::new("http://127.0.0.1:8080", "token", Duration::from_secs(30))?;
//! for file in client.list_files().await? {
//!     println!("{} {}", file.id, file.original_name);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{header, multipart, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use filevault_core::config::ClientConfig;
use filevault_core::domain::{newtypes::FileId, FileView, UserStats};
use filevault_core::usecases::BatchDeleteReport;

use crate::ClientError;

// ============================================================================
// Wire types
// ============================================================================

/// Response envelope shared by every JSON route
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    #[allow(dead_code)]
    message: Option<String>,
    data: Option<T>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(rename = "type")]
    #[allow(dead_code)]
    kind: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateContentBody<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteBatchBody<'a> {
    file_ids: &'a [String],
}

/// Code used when a failed response carries no envelope
const CODE_HTTP_STATUS: &str = "Http.Status";

// ============================================================================
// ApiClient
// ============================================================================

/// Authenticated client for one FileVault server
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Creates a client for `base_url` with a request timeout
    ///
    /// # Errors
    /// Returns [`ClientError::Decode`] when `base_url` is not an http(s) URL.
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| ClientError::Decode(format!("invalid server URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::Decode(format!(
                "server URL must use http or https: {base_url}"
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Creates a client from the `client` config section
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ClientError::MissingToken)?;
        Self::new(
            &config.server_url,
            token,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Creates a client with default settings and a custom base URL
    /// (useful for testing)
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds an authenticated request for `path` (relative to the base URL)
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, &url).bearer_auth(&self.token)
    }

    // ------------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------------

    /// Lists every file of the authenticated owner, newest first
    #[instrument(skip(self))]
    pub async fn list_files(&self) -> Result<Vec<FileView>, ClientError> {
        let response = self.request(Method::GET, "/files").send().await?;
        let files: Vec<FileView> = required(parse_envelope(response).await?)?;
        debug!(count = files.len(), "Listed files");
        Ok(files)
    }

    /// Fetches the metadata of one file
    #[instrument(skip(self))]
    pub async fn get_file(&self, id: &FileId) -> Result<FileView, ClientError> {
        let response = self
            .request(Method::GET, &format!("/files/{id}"))
            .send()
            .await?;
        required(parse_envelope(response).await?)
    }

    /// Uploads `content` as a new file named `file_name`
    ///
    /// Sent as `multipart/form-data` with a single `file` field.
    #[instrument(skip(self, content), fields(size = content.len()))]
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        content: Vec<u8>,
    ) -> Result<FileView, ClientError> {
        let mut part = multipart::Part::bytes(content).file_name(file_name.to_string());
        if let Some(mime) = content_type {
            part = part.mime_str(mime)?;
        }
        let form = multipart::Form::new().part("file", part);

        let response = self
            .request(Method::POST, "/files/upload")
            .multipart(form)
            .send()
            .await?;
        let view: FileView = required(parse_envelope(response).await?)?;
        debug!(id = %view.id, "Uploaded file");
        Ok(view)
    }

    /// Replaces the content of an existing file with text
    #[instrument(skip(self, content), fields(size = content.len()))]
    pub async fn update_content(&self, id: &FileId, content: &str) -> Result<FileView, ClientError> {
        let response = self
            .request(Method::PUT, &format!("/files/{id}"))
            .json(&UpdateContentBody { content })
            .send()
            .await?;
        required(parse_envelope(response).await?)
    }

    /// Deletes one file
    #[instrument(skip(self))]
    pub async fn delete_file(&self, id: &FileId) -> Result<(), ClientError> {
        let response = self
            .request(Method::DELETE, &format!("/files/{id}"))
            .send()
            .await?;
        parse_envelope::<serde_json::Value>(response).await?;
        Ok(())
    }

    /// Deletes several files; ids are sent verbatim so the server can
    /// report malformed ones
    #[instrument(skip(self), fields(count = ids.len()))]
    pub async fn delete_batch(&self, ids: &[String]) -> Result<BatchDeleteReport, ClientError> {
        let response = self
            .request(Method::POST, "/files/delete-batch")
            .json(&DeleteBatchBody { file_ids: ids })
            .send()
            .await?;
        required(parse_envelope(response).await?)
    }

    /// File count and total size of the authenticated owner
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<UserStats, ClientError> {
        let response = self.request(Method::GET, "/files/stats").send().await?;
        required(parse_envelope(response).await?)
    }

    /// Starts a download; the body is consumed through [`DownloadResponse`]
    #[instrument(skip(self))]
    pub async fn download(&self, id: &FileId) -> Result<DownloadResponse, ClientError> {
        let response = self
            .request(Method::GET, &format!("/files/{id}/download"))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let headers = response.headers();
        let file_name = headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_file_name);
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();

        Ok(DownloadResponse {
            file_name,
            content_type,
            content_length,
            response,
        })
    }
}

// ============================================================================
// Downloads
// ============================================================================

/// Headers of a successful download plus its unread body
#[derive(Debug)]
pub struct DownloadResponse {
    /// File name from `Content-Disposition`, reduced to its last component
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    response: Response,
}

impl DownloadResponse {
    /// Reads the whole body into memory
    pub async fn bytes(self) -> Result<Vec<u8>, ClientError> {
        Ok(self.response.bytes().await?.to_vec())
    }

    /// Streams the body to `dest`
    ///
    /// Data goes to `dest.part` first and is renamed into place once
    /// complete, so an interrupted download never leaves a truncated file
    /// under the final name.
    pub async fn save_to(self, dest: &Path) -> Result<u64, ClientError> {
        let temp = part_path(dest);
        match stream_to(self.response, &temp).await {
            Ok(written) => {
                tokio::fs::rename(&temp, dest).await?;
                debug!(path = %dest.display(), bytes = written, "Download saved");
                Ok(written)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                    warn!(path = %temp.display(), error = %cleanup, "Failed to remove partial download");
                }
                Err(e)
            }
        }
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn stream_to(response: Response, path: &Path) -> Result<u64, ClientError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

/// Extracts the file name from a `Content-Disposition` value
///
/// Prefers the percent-encoded `filename*=UTF-8''...` form, falling back to
/// the plain `filename="..."` parameter.
fn attachment_file_name(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for param in value.split(';').map(str::trim) {
        if let Some(encoded) = param.strip_prefix("filename*=UTF-8''") {
            extended = urlencoding::decode(encoded).ok().map(|name| name.into_owned());
        } else if let Some(raw) = param.strip_prefix("filename=") {
            plain = Some(raw.trim_matches('"').to_string());
        }
    }

    let raw = extended.or(plain)?;
    let name = Path::new(&raw).file_name()?.to_str()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

// ============================================================================
// Envelope handling
// ============================================================================

async fn parse_envelope<T: DeserializeOwned>(response: Response) -> Result<Option<T>, ClientError> {
    let status = response.status();
    let body = response.bytes().await?;

    match serde_json::from_slice::<Envelope<T>>(&body) {
        Ok(envelope) if envelope.success && status.is_success() => Ok(envelope.data),
        Ok(envelope) => Err(api_error(status, envelope.error, &body)),
        Err(e) if status.is_success() => Err(ClientError::Decode(e.to_string())),
        Err(_) => Err(api_error(status, error_body(&body), &body)),
    }
}

async fn error_from_response(response: Response) -> ClientError {
    let status = response.status();
    match response.bytes().await {
        Ok(body) => api_error(status, error_body(&body), &body),
        Err(e) => ClientError::Http(e),
    }
}

/// Error part of an envelope whose data type is unknown
fn error_body(body: &[u8]) -> Option<ErrorBody> {
    serde_json::from_slice::<Envelope<serde_json::Value>>(body)
        .ok()
        .and_then(|e| e.error)
}

fn api_error(status: StatusCode, error: Option<ErrorBody>, body: &[u8]) -> ClientError {
    match error {
        Some(ErrorBody { code, message, .. }) => ClientError::Api {
            status,
            code,
            message,
        },
        None => {
            let text = String::from_utf8_lossy(body);
            let message = if text.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                text.chars().take(200).collect()
            };
            ClientError::Api {
                status,
                code: CODE_HTTP_STATUS.to_string(),
                message,
            }
        }
    }
}

fn required<T>(data: Option<T>) -> Result<T, ClientError> {
    data.ok_or_else(|| ClientError::Decode("response envelope has no data".to_string()))
}
