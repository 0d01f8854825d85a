//! Use cases (interactors) for FileVault
//!
//! Use cases orchestrate domain entities and port interfaces. They own
//! validation order and cross-store consistency; storage details stay in
//! the adapters.
//!
//! ## Use Cases
//!
//! - [`FileService`] - upload, replace, read, delete and statistics
//! - [`Saga`] - the step/compensation runner behind every write

pub mod file_service;
pub mod saga;

pub use file_service::{
    BatchDeleteReport, Download, FileService, SkipReason, SkippedFile, UploadPolicy,
    UploadRequest,
};
pub use saga::{Saga, SagaFailure, SagaStep};
