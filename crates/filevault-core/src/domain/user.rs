//! Users (file owners)
//!
//! A user owns a blob namespace and authenticates with an opaque bearer
//! token. Only the SHA-256 of the token is ever persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;
use super::newtypes::{ContentHash, OwnerId};
use crate::hashing;

/// Maximum accepted username length
const MAX_USERNAME_LEN: usize = 64;

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: OwnerId,
    username: String,
    created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user with a fresh id
    ///
    /// # Errors
    /// Returns error if the username is empty, too long, or contains
    /// whitespace or control characters
    pub fn new(username: impl Into<String>) -> Result<Self, DomainError> {
        let username = username.into();
        validate_username(&username)?;
        Ok(Self {
            id: OwnerId::new(),
            username,
            created_at: Utc::now(),
        })
    }

    /// Rebuilds a user from persisted values
    pub fn with_id(id: OwnerId, username: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            username,
            created_at,
        }
    }

    pub fn id(&self) -> &OwnerId {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn validate_username(username: &str) -> Result<(), DomainError> {
    if username.is_empty() {
        return Err(DomainError::ValidationFailed(
            "username cannot be empty".to_string(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(DomainError::ValidationFailed(format!(
            "username exceeds {MAX_USERNAME_LEN} characters"
        )));
    }
    if username
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(DomainError::ValidationFailed(format!(
            "username contains whitespace or control characters: {username:?}"
        )));
    }
    Ok(())
}

/// Generates a new random bearer token (64 hex characters)
pub fn generate_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// Digest under which a bearer token is stored and looked up
pub fn token_digest(token: &str) -> ContentHash {
    hashing::hash_bytes(token.as_bytes())
}
