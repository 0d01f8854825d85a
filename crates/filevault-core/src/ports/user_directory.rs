//! User directory port (driven/secondary port)
//!
//! Resolves owners for the orchestrator and bearer tokens for the HTTP
//! layer. Token issuance is deliberately minimal: a random token is handed
//! out once and only its digest is stored.

use crate::domain::{newtypes::OwnerId, User};

/// Port trait for user lookup and registration
#[async_trait::async_trait]
pub trait IUserDirectory: Send + Sync {
    /// Finds a user by id
    async fn find_user(&self, id: &OwnerId) -> anyhow::Result<Option<User>>;

    /// Finds the user holding `token`
    async fn find_by_token(&self, token: &str) -> anyhow::Result<Option<User>>;

    /// Registers `user` with a freshly generated token and returns the token
    ///
    /// Fails when the username is already taken.
    async fn register(&self, user: &User) -> anyhow::Result<String>;
}
