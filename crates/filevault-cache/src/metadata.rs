//! SQLite implementation of IMetadataStore
//!
//! ## Type Mapping
//!
//! | Domain Type        | SQL Type | Strategy                                   |
//! |--------------------|----------|--------------------------------------------|
//! | FileId, OwnerId    | TEXT     | UUID string via `.to_string()` / `FromStr` |
//! | ContentHash        | TEXT     | hex string via `.as_str()` / `ContentHash::new()` |
//! | size (u64)         | INTEGER  | `i64`, rejected on read when negative      |
//! | DateTime<Utc>      | TEXT     | fixed-width RFC 3339, nanoseconds          |
//!
//! A unit of work runs inside one transaction. Updates are scoped by owner
//! as well as by id, so a record can never change owner.

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use filevault_core::domain::{
    newtypes::{ContentHash, FileId, OwnerId},
    FileRecord, UserStats,
};
use filevault_core::ports::{IMetadataStore, MetadataChange, UnitOfWork};

use crate::{format_datetime, parse_datetime, CacheError};

/// SQLite-based implementation of the metadata store port
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Row mapping
// ============================================================================

/// Reconstruct a FileRecord from a database row
fn file_record_from_row(row: &SqliteRow) -> Result<FileRecord, CacheError> {
    let id_str: String = row.get("id");
    let owner_str: String = row.get("owner_id");
    let original_name: String = row.get("original_name");
    let size: i64 = row.get("size");
    let content_type: String = row.get("content_type");
    let hash_str: String = row.get("content_hash");
    let created_str: String = row.get("created_at");
    let modified_str: String = row.get("modified_at");

    let id = FileId::from_str(&id_str)
        .map_err(|e| CacheError::SerializationError(format!("Invalid file id: {}", e)))?;
    let owner_id = OwnerId::from_str(&owner_str)
        .map_err(|e| CacheError::SerializationError(format!("Invalid owner id: {}", e)))?;
    let content_hash = ContentHash::new(hash_str)
        .map_err(|e| CacheError::SerializationError(format!("Invalid content hash: {}", e)))?;
    let size = u64::try_from(size)
        .map_err(|_| CacheError::SerializationError(format!("Negative size {} for {}", size, id)))?;

    Ok(FileRecord::with_id(
        id,
        owner_id,
        original_name,
        content_type,
        size,
        content_hash,
        parse_datetime(&created_str)?,
        parse_datetime(&modified_str)?,
    ))
}

fn size_to_sql(size: u64) -> Result<i64, CacheError> {
    i64::try_from(size)
        .map_err(|_| CacheError::SerializationError(format!("Size {} exceeds i64", size)))
}

// ============================================================================
// Unit of work application
// ============================================================================

async fn apply_change(
    tx: &mut Transaction<'static, Sqlite>,
    change: &MetadataChange,
) -> Result<(), CacheError> {
    match change {
        MetadataChange::Create(record) => {
            sqlx::query(
                "INSERT INTO files \
                 (id, owner_id, original_name, size, content_type, content_hash, \
                  created_at, modified_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(record.id().to_string())
            .bind(record.owner_id().to_string())
            .bind(record.original_name())
            .bind(size_to_sql(record.size())?)
            .bind(record.content_type())
            .bind(record.content_hash().as_str())
            .bind(format_datetime(&record.created_at()))
            .bind(format_datetime(&record.modified_at()))
            .execute(&mut **tx)
            .await?;
        }
        MetadataChange::Update(record) => {
            let result = sqlx::query(
                "UPDATE files SET original_name = ?, size = ?, content_type = ?, \
                 content_hash = ?, modified_at = ? \
                 WHERE id = ? AND owner_id = ?",
            )
            .bind(record.original_name())
            .bind(size_to_sql(record.size())?)
            .bind(record.content_type())
            .bind(record.content_hash().as_str())
            .bind(format_datetime(&record.modified_at()))
            .bind(record.id().to_string())
            .bind(record.owner_id().to_string())
            .execute(&mut **tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(CacheError::NoSuchRecord(format!("update {}", record.id())));
            }
        }
        MetadataChange::Delete(id) => {
            let result = sqlx::query("DELETE FROM files WHERE id = ?")
                .bind(id.to_string())
                .execute(&mut **tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(CacheError::NoSuchRecord(format!("delete {}", id)));
            }
        }
    }
    Ok(())
}

// ============================================================================
// IMetadataStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IMetadataStore for SqliteMetadataStore {
    async fn get(&self, id: &FileId) -> anyhow::Result<Option<FileRecord>> {
        let row = sqlx::query("SELECT * FROM files WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(file_record_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn get_owned(
        &self,
        id: &FileId,
        owner: &OwnerId,
    ) -> anyhow::Result<Option<FileRecord>> {
        let row = sqlx::query("SELECT * FROM files WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(file_record_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> anyhow::Result<Vec<FileRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM files WHERE owner_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(file_record_from_row(row)?);
        }
        Ok(records)
    }

    async fn owner_stats(&self, owner: &OwnerId) -> anyhow::Result<UserStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total_files, COALESCE(SUM(size), 0) AS total_size \
             FROM files WHERE owner_id = ?",
        )
        .bind(owner.to_string())
        .fetch_one(&self.pool)
        .await?;

        let total_files: i64 = row.get("total_files");
        let total_size: i64 = row.get("total_size");

        Ok(UserStats::new(
            u64::try_from(total_files).unwrap_or_default(),
            u64::try_from(total_size).unwrap_or_default(),
        ))
    }

    #[tracing::instrument(skip(self, work), fields(changes = work.len()))]
    async fn commit(&self, work: UnitOfWork) -> anyhow::Result<()> {
        if work.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for change in work.changes() {
            if let Err(e) = apply_change(&mut tx, change).await {
                tracing::warn!(error = %e, "Rolling back unit of work");
                tx.rollback().await?;
                return Err(e.into());
            }
        }
        tx.commit().await?;

        tracing::debug!("Unit of work committed");
        Ok(())
    }
}
