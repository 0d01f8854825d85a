//! Domain entities and business logic
//!
//! This module contains the core domain types for FileVault:
//! - Newtypes for type-safe identifiers and validated values
//! - File metadata records and their public representation
//! - Users (file owners)
//! - Storage statistics
//! - Domain-specific error types

pub mod errors;
pub mod file_record;
pub mod newtypes;
pub mod stats;
pub mod user;

// Re-export commonly used types
pub use errors::{DomainError, ErrorKind, FileError};
pub use file_record::{FileRecord, FileView, DEFAULT_CONTENT_TYPE};
pub use newtypes::*;
pub use stats::{format_size, UserStats};
pub use user::User;
