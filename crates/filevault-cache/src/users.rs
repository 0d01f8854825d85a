//! SQLite implementation of IUserDirectory
//!
//! Tokens are never stored. Registration keeps the SHA-256 digest of the
//! freshly generated token, and lookups hash the presented token the same
//! way before querying.

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use filevault_core::domain::{
    newtypes::OwnerId,
    user::{generate_token, token_digest},
    User,
};
use filevault_core::ports::IUserDirectory;

use crate::{format_datetime, parse_datetime, CacheError};

/// SQLite-based implementation of the user directory port
pub struct SqliteUserDirectory {
    pool: SqlitePool,
}

impl SqliteUserDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Looks a user up by name
    pub async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(user_from_row(r)?)),
            None => Ok(None),
        }
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, CacheError> {
    let id_str: String = row.get("id");
    let username: String = row.get("username");
    let created_str: String = row.get("created_at");

    let id = OwnerId::from_str(&id_str)
        .map_err(|e| CacheError::SerializationError(format!("Invalid user id: {}", e)))?;

    Ok(User::with_id(id, username, parse_datetime(&created_str)?))
}

#[async_trait::async_trait]
impl IUserDirectory for SqliteUserDirectory {
    async fn find_user(&self, id: &OwnerId) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(user_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_token(&self, token: &str) -> anyhow::Result<Option<User>> {
        let digest = token_digest(token);
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE token_hash = ?")
            .bind(digest.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(user_from_row(r)?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, user), fields(username = %user.username()))]
    async fn register(&self, user: &User) -> anyhow::Result<String> {
        let token = generate_token();

        let result = sqlx::query(
            "INSERT INTO users (id, username, token_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user.id().to_string())
        .bind(user.username())
        .bind(token_digest(&token).as_str())
        .bind(format_datetime(&user.created_at()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::info!(user_id = %user.id(), "User registered");
                Ok(token)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(CacheError::DuplicateUser(user.username().to_string()).into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
