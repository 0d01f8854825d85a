//! Bearer token authentication
//!
//! The token is looked up through the user directory, which only ever
//! compares SHA-256 digests. The resolved owner is attached to the request
//! as a [`CurrentUser`] extension.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use filevault_core::domain::newtypes::OwnerId;

use crate::error::ApiError;
use crate::AppState;

/// Authenticated owner of the current request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: OwnerId,
    pub username: String,
}

/// Extracts the token from an `Authorization` header value
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Rejects requests without a known bearer token with 401 `Auth.Unauthorized`
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::unauthorized("Missing or invalid Authorization header"))?;

    let user = state
        .users
        .find_by_token(token)
        .await
        .map_err(|e| ApiError::unexpected(format!("Token lookup failed: {e:#}")))?
        .ok_or_else(|| ApiError::unauthorized("Unknown token"))?;

    request.extensions_mut().insert(CurrentUser {
        id: *user.id(),
        username: user.username().to_string(),
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
