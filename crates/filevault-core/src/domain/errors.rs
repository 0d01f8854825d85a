//! Domain error types
//!
//! Two layers live here:
//! - [`DomainError`] for construction and parsing of domain values
//!   (identifiers, hashes, stored names).
//! - [`FileError`] for the outcome of file operations. Every variant carries a
//!   stable code and an [`ErrorKind`] that the HTTP layer maps to a status.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when constructing domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Invalid hash format (expected 64 lowercase hex characters)
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),

    /// Stored blob name would escape its namespace or is empty
    #[error("Invalid stored name: {0}")]
    InvalidStoredName(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Error category, serialized with the exact names used on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Unauthorized,
    Conflict,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Validation => "Validation",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Conflict => "Conflict",
        };
        write!(f, "{}", s)
    }
}

/// Stable error codes
pub mod codes {
    pub const EMPTY_FILE: &str = "File.EmptyFile";
    pub const INVALID_FILE_SIZE: &str = "File.InvalidFileSize";
    pub const INVALID_FILE_TYPE: &str = "File.InvalidFileType";
    pub const INVALID_FILE_NAME: &str = "File.InvalidFileName";
    pub const FILE_NOT_FOUND: &str = "File.NotFound";
    pub const INVALID_ID: &str = "File.InvalidId";
    pub const UPLOAD_FAILED: &str = "File.UploadFailed";
    pub const USER_NOT_FOUND: &str = "User.NotFound";
    pub const UNAUTHORIZED: &str = "Auth.Unauthorized";
    pub const VALIDATION_FAILED: &str = "General.ValidationFailed";
    pub const UNEXPECTED: &str = "General.UnexpectedError";
}

/// Outcome of a failed file operation
///
/// `Validation` and `NotFound` never touch storage. `UploadFailed` is
/// returned after a storage or commit failure and any compensation has run.
/// `Unexpected` carries internal detail for logs only; [`FileError::public_message`]
/// never exposes it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FileError {
    /// Input rejected before any storage access
    #[error("{message}")]
    Validation { code: &'static str, message: String },

    /// Unknown resource, or a resource owned by somebody else
    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    /// The identifier is not a well-formed file id
    #[error("Invalid file identifier: {0}")]
    InvalidIdentifier(String),

    /// Blob write or metadata commit failed
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Missing or unknown credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Anything the caller cannot act on
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl FileError {
    pub fn empty_file() -> Self {
        FileError::Validation {
            code: codes::EMPTY_FILE,
            message: "The file is empty.".to_string(),
        }
    }

    pub fn file_too_large(max_bytes: u64) -> Self {
        FileError::Validation {
            code: codes::INVALID_FILE_SIZE,
            message: format!(
                "The file exceeds the maximum allowed size of {}.",
                super::stats::format_size(max_bytes)
            ),
        }
    }

    pub fn invalid_file_type(extension: &str) -> Self {
        let shown = if extension.is_empty() {
            "(none)"
        } else {
            extension
        };
        FileError::Validation {
            code: codes::INVALID_FILE_TYPE,
            message: format!("File type '{}' is not allowed.", shown),
        }
    }

    pub fn invalid_file_name(name: &str) -> Self {
        FileError::Validation {
            code: codes::INVALID_FILE_NAME,
            message: format!("'{}' is not a usable file name.", name),
        }
    }

    pub fn file_not_found() -> Self {
        FileError::NotFound {
            code: codes::FILE_NOT_FOUND,
            message: "File not found.".to_string(),
        }
    }

    pub fn user_not_found() -> Self {
        FileError::NotFound {
            code: codes::USER_NOT_FOUND,
            message: "User not found.".to_string(),
        }
    }

    /// Stable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            FileError::Validation { code, .. } | FileError::NotFound { code, .. } => *code,
            FileError::InvalidIdentifier(_) => codes::INVALID_ID,
            FileError::UploadFailed(_) => codes::UPLOAD_FAILED,
            FileError::Unauthorized(_) => codes::UNAUTHORIZED,
            FileError::Unexpected(_) => codes::UNEXPECTED,
        }
    }

    /// Category used for status mapping
    ///
    /// `UploadFailed` is reported as a validation-class failure, matching
    /// the wire contract clients already depend on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FileError::NotFound { .. } => ErrorKind::NotFound,
            FileError::Unauthorized(_) => ErrorKind::Unauthorized,
            FileError::Validation { .. }
            | FileError::InvalidIdentifier(_)
            | FileError::UploadFailed(_)
            | FileError::Unexpected(_) => ErrorKind::Validation,
        }
    }

    /// Whether this error is an internal fault (maps to a 500-class response)
    pub fn is_unexpected(&self) -> bool {
        matches!(self, FileError::Unexpected(_))
    }

    /// Message safe to show to the caller
    pub fn public_message(&self) -> String {
        match self {
            FileError::Validation { message, .. } | FileError::NotFound { message, .. } => {
                message.clone()
            }
            FileError::InvalidIdentifier(_) => "Invalid file ID format.".to_string(),
            FileError::UploadFailed(_) => "Failed to store the file.".to_string(),
            FileError::Unauthorized(_) => "Authentication required.".to_string(),
            FileError::Unexpected(_) => "An unexpected error occurred.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_display() {
        let err = DomainError::InvalidId("nope".to_string());
        assert_eq!(err.to_string(), "Invalid ID format: nope");

        let err = DomainError::InvalidHash("xyz".to_string());
        assert_eq!(err.to_string(), "Invalid hash format: xyz");
    }

    #[test]
    fn test_codes_and_kinds() {
        assert_eq!(FileError::empty_file().code(), "File.EmptyFile");
        assert_eq!(FileError::empty_file().kind(), ErrorKind::Validation);

        assert_eq!(FileError::file_not_found().code(), "File.NotFound");
        assert_eq!(FileError::file_not_found().kind(), ErrorKind::NotFound);

        assert_eq!(FileError::user_not_found().code(), "User.NotFound");

        let err = FileError::InvalidIdentifier("abc".into());
        assert_eq!(err.code(), "File.InvalidId");
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = FileError::Unauthorized("no token".into());
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_public_message_hides_internal_detail() {
        let err = FileError::Unexpected("disk controller on fire at /dev/sda".into());
        assert!(!err.public_message().contains("/dev/sda"));
        assert!(err.is_unexpected());

        let err = FileError::UploadFailed("EACCES /srv/blobs/x".into());
        assert!(!err.public_message().contains("/srv"));
        assert!(!err.is_unexpected());
    }

    #[test]
    fn test_invalid_file_type_without_extension() {
        let err = FileError::invalid_file_type("");
        assert!(err.public_message().contains("(none)"));
    }

    #[test]
    fn test_error_kind_serializes_as_name() {
        let json = serde_json::to_string(&ErrorKind::NotFound).unwrap();
        assert_eq!(json, "\"NotFound\"");
        assert_eq!(ErrorKind::Conflict.to_string(), "Conflict");
    }
}
