//! SQLite pool for the metadata database
//!
//! Opening a database goes through one gate: connect with foreign keys on,
//! bring the schema to [`SCHEMA_VERSION`] (tracked in `PRAGMA user_version`),
//! then confirm that every file row still names a registered owner. A
//! database written by a newer build is refused rather than guessed at.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::CacheError;

/// Schema revision this build reads and writes
pub const SCHEMA_VERSION: i64 = 1;

/// Ordered schema steps; entry `n` lifts a database from version `n` to `n + 1`
const MIGRATIONS: &[&str] = &[include_str!("migrations/20260101_initial.sql")];

/// Shared handle to the metadata database
#[derive(Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the database file at `db_path`
    ///
    /// Runs in WAL mode with up to 5 connections and a 5 second busy
    /// timeout so concurrent uploads queue instead of failing on the lock.
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let db = Self::open(options, 5).await.map_err(|e| match e {
            CacheError::ConnectionFailed(msg) => CacheError::ConnectionFailed(format!(
                "{} ({})",
                msg,
                db_path.display()
            )),
            other => other,
        })?;

        tracing::info!(
            path = %db_path.display(),
            schema_version = SCHEMA_VERSION,
            "Metadata database ready"
        );
        Ok(db)
    }

    /// Private in-memory database, used by tests
    ///
    /// Held on a single connection: every SQLite connection to `:memory:`
    /// gets its own empty database.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;
        Self::open(options, 1).await
    }

    async fn open(options: SqliteConnectOptions, max_connections: u32) -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options.foreign_keys(true))
            .await
            .map_err(|e| CacheError::ConnectionFailed(format!("Failed to open database: {}", e)))?;

        let db = Self { pool };
        db.require_foreign_keys().await?;
        db.migrate().await?;

        let orphans = db.orphaned_records().await?;
        if orphans > 0 {
            tracing::warn!(orphans, "File records reference unknown owners");
        }
        Ok(db)
    }

    /// Returns a reference to the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every connection; pending queries finish first
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Schema revision recorded in the database file
    pub async fn schema_version(&self) -> Result<i64, CacheError> {
        let row = sqlx::query("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get(0)?)
    }

    /// File rows whose owner is not in `users`
    ///
    /// Always zero while foreign keys are enforced; a non-zero count means
    /// the file was edited by something that switched them off.
    pub async fn orphaned_records(&self) -> Result<usize, CacheError> {
        let rows = sqlx::query("PRAGMA foreign_key_check(files)")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.len())
    }

    async fn require_foreign_keys(&self) -> Result<(), CacheError> {
        let row = sqlx::query("PRAGMA foreign_keys")
            .fetch_one(&self.pool)
            .await?;
        let enabled: i64 = row.try_get(0)?;
        if enabled != 1 {
            return Err(CacheError::ConnectionFailed(
                "SQLite build does not enforce foreign keys".to_string(),
            ));
        }
        Ok(())
    }

    async fn migrate(&self) -> Result<(), CacheError> {
        let current = self.schema_version().await?;
        if current > SCHEMA_VERSION {
            return Err(CacheError::MigrationFailed(format!(
                "database schema v{} is newer than supported v{}",
                current, SCHEMA_VERSION
            )));
        }

        for (from, step) in MIGRATIONS.iter().enumerate().skip(current as usize) {
            let to = from as i64 + 1;
            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(step)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    CacheError::MigrationFailed(format!("Schema step v{} failed: {}", to, e))
                })?;
            // PRAGMA values cannot be bound parameters.
            sqlx::raw_sql(&format!("PRAGMA user_version = {to}"))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            tracing::debug!(version = to, "Applied schema step");
        }
        Ok(())
    }
}
