//! FileVault Cache - Metadata persistence
//!
//! SQLite-based storage for:
//! - File records (the metadata half of every stored file)
//! - Users and the digests of their bearer tokens
//!
//! ## Architecture
//!
//! This crate implements the `IMetadataStore` and `IUserDirectory` ports
//! from `filevault-core` using SQLite as the storage backend. It is a driven
//! (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteMetadataStore`] - `IMetadataStore` with transactional unit-of-work commits
//! - [`SqliteUserDirectory`] - `IUserDirectory` with hashed token lookup
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use filevault_cache::{DatabasePool, SqliteMetadataStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/filevault/filevault.db")).await?;
//! let store = SqliteMetadataStore::new(pool.pool().clone());
//! // Use store as IMetadataStore...
//! # Ok(())
//! # }
//! ```

pub mod metadata;
pub mod pool;
pub mod users;

pub use metadata::SqliteMetadataStore;
pub use pool::DatabasePool;
pub use users::SqliteUserDirectory;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be turned back into a domain type
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An update or delete in a unit of work matched no row
    #[error("No such record: {0}")]
    NoSuchRecord(String),

    /// Username already registered
    #[error("Username already taken: {0}")]
    DuplicateUser(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

/// Timestamp format shared by every table: fixed-width, so text order is time order
pub(crate) fn format_datetime(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

/// Parse a DateTime<Utc> from its stored RFC 3339 form
pub(crate) fn parse_datetime(s: &str) -> Result<chrono::DateTime<chrono::Utc>, CacheError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}
