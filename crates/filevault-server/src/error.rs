//! Response envelope and error mapping
//!
//! Every JSON route answers with [`ApiResponse`] on success and [`ApiError`]
//! on failure. The error `type` drives the status code:
//!
//! | type         | status |
//! |--------------|--------|
//! | NotFound     | 404    |
//! | Validation   | 400    |
//! | Unauthorized | 401    |
//! | Conflict     | 409    |
//!
//! Unexpected failures are answered with 500 and a generic message; the
//! detail only goes to the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use filevault_core::domain::{ErrorKind, FileError};

/// Message of successful responses without a more specific one
pub const MSG_OK: &str = "Operation completed successfully";

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: MSG_OK.to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn success_message(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    success: bool,
    error: ErrorBody<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
    #[serde(rename = "type")]
    kind: ErrorKind,
}

/// Failed request, rendered as the error envelope
#[derive(Debug)]
pub struct ApiError(pub FileError);

impl From<FileError> for ApiError {
    fn from(err: FileError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        ApiError(FileError::Unauthorized(detail.into()))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError(FileError::Validation {
            code: filevault_core::domain::errors::codes::VALIDATION_FAILED,
            message: message.into(),
        })
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        ApiError(FileError::Unexpected(detail.into()))
    }

    pub fn status(&self) -> StatusCode {
        if self.0.is_unexpected() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self.0.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Conflict => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self.0 {
            FileError::Unexpected(detail) => {
                tracing::error!(code = self.0.code(), detail = %detail, "Request failed unexpectedly");
            }
            FileError::UploadFailed(detail) => {
                tracing::error!(code = self.0.code(), detail = %detail, "Upload failed");
            }
            FileError::Unauthorized(detail) => {
                tracing::debug!(detail = %detail, "Rejected unauthenticated request");
            }
            other => {
                tracing::debug!(code = other.code(), "Request rejected");
            }
        }

        let body = ErrorEnvelope {
            success: false,
            error: ErrorBody {
                code: self.0.code(),
                message: self.0.public_message(),
                kind: self.0.kind(),
            },
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
