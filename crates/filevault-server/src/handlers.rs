//! Route handlers for `/files` and `/health`
//!
//! Handlers only translate HTTP to [`FileService`] calls; ownership checks,
//! validation and storage live in the service.
//!
//! [`FileService`]: filevault_core::usecases::FileService

use axum::{
    body::Body,
    extract::{
        multipart::MultipartError,
        rejection::JsonRejection,
        Multipart, Path, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::Response,
    Extension, Json,
};
use bytes::Bytes;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::debug;

use filevault_core::domain::{FileError, FileView, UserStats};
use filevault_core::usecases::{BatchDeleteReport, UploadRequest};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::AppState;

/// Name of the multipart field carrying the upload
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct UpdateContentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBatchRequest {
    pub file_ids: Vec<String>,
}

/// Liveness check
/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// List the caller's files, newest first
/// GET /files
pub async fn list_files(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<Vec<FileView>>>> {
    let files = state.files.list_files(&user.id).await?;
    Ok(Json(ApiResponse::success(files)))
}

/// Get one file's metadata
/// GET /files/:id
pub async fn get_file(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<FileView>>> {
    let file = state.files.get_file(&user.id, &id).await?;
    Ok(Json(ApiResponse::success(file)))
}

/// Owner statistics
/// GET /files/stats
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<UserStats>>> {
    let stats = state.files.stats(&user.id).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// Upload a file
/// POST /files/upload (multipart, field `file`)
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> ApiResult<Json<ApiResponse<FileView>>> {
    let max_bytes = state.files.policy().max_file_size_bytes();
    let mut upload: Option<UploadRequest> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let content = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?;

        upload = Some(UploadRequest {
            file_name,
            content_type,
            content,
        });
        break;
    }

    let upload = upload.ok_or_else(FileError::empty_file)?;
    let view = state.files.upload(&user.id, upload).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// Map multipart failures; an oversized body is reported like any other
/// too-large upload
fn multipart_error(err: MultipartError, max_bytes: u64) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError(FileError::file_too_large(max_bytes))
    } else {
        ApiError::bad_request(format!("Failed to process multipart: {}", err.body_text()))
    }
}

/// Replace a file's content with text
/// PUT /files/:id
pub async fn update_content(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<UpdateContentRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<FileView>>> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let view = state
        .files
        .replace_content(&user.id, &id, Bytes::from(request.content))
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

/// Delete one file
/// DELETE /files/:id
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.files.delete_file(&user.id, &id).await?;
    Ok(Json(ApiResponse::success_message("File deleted successfully")))
}

/// Delete several files
/// POST /files/delete-batch
pub async fn delete_batch(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    body: Result<Json<DeleteBatchRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<BatchDeleteReport>>> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let report = state.files.delete_files(&user.id, &request.file_ids).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Stream a file's bytes
/// GET /files/:id/download
pub async fn download_file(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let download = state.files.download(&user.id, &id).await?;
    let file = download.file;
    debug!(file_id = %file.id, size = file.size, "Streaming download");

    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition(&file.original_name))
        .map_err(|e| ApiError::unexpected(format!("Invalid Content-Disposition: {e}")))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, file.size)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReaderStream::new(download.content)))
        .map_err(|e| ApiError::unexpected(format!("Failed to build response: {e}")))
}

/// `attachment` disposition with an ASCII fallback name and the exact
/// name percent-encoded in `filename*`
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(name)
    )
}
