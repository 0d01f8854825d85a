//! FileVault Client - HTTP access to a FileVault server
//!
//! Provides an async client for:
//! - Listing, inspecting and deleting files
//! - Multipart uploads and streamed downloads
//! - Owner statistics
//!
//! [`client::ApiClient`] also implements the sync crate's
//! [`IRemoteFiles`](filevault_sync::IRemoteFiles) port, so a
//! [`Reconciler`](filevault_sync::Reconciler) can run against a live server.
//!
//! ## Modules
//!
//! - [`client`] - The HTTP client and the response envelope
//! - [`remote`] - `IRemoteFiles` adapter

pub mod client;
pub mod remote;

use reqwest::StatusCode;
use thiserror::Error;

pub use client::{ApiClient, DownloadResponse};

/// Errors that can occur when talking to a FileVault server
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error envelope
    ///
    /// The status is part of the message so that retry classification can
    /// see it (`503`, `429`).
    #[error("HTTP {status}: {code}: {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    /// Transport failure (connection, timeout, TLS)
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response could not be decoded
    #[error("Invalid response: {0}")]
    Decode(String),

    /// No bearer token is configured
    #[error("No API token configured; set client.token in the config file")]
    MissingToken,

    /// Local I/O while saving a download
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Stable error code of an API error
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// Failures worth retrying for idempotent requests: no response at all,
    /// `429`, or a `5xx`
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Api { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            ClientError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
                    })
            }
            ClientError::Decode(_) | ClientError::MissingToken | ClientError::Io(_) => false,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}
