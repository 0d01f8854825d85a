//! FileVault Server - HTTP API over the file service
//!
//! Exposes the owner-scoped file operations of
//! [`FileService`](filevault_core::usecases::FileService) as a JSON API.
//! All `/files` routes require `Authorization: Bearer <token>`.
//!
//! ## Modules
//!
//! - [`auth`] - Bearer token middleware
//! - [`error`] - Response envelope and status mapping
//! - [`handlers`] - Route handlers

pub mod auth;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use filevault_core::ports::IUserDirectory;
use filevault_core::usecases::FileService;

/// Multipart framing allowance on top of the largest accepted file
pub const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub files: Arc<FileService>,
    pub users: Arc<dyn IUserDirectory>,
}

impl AppState {
    pub fn new(files: Arc<FileService>, users: Arc<dyn IUserDirectory>) -> Self {
        Self { files, users }
    }

    /// Largest request body accepted by the router
    pub fn body_limit(&self) -> usize {
        let limit = self
            .files
            .policy()
            .max_file_size_bytes()
            .saturating_add(MULTIPART_OVERHEAD_BYTES);
        usize::try_from(limit).unwrap_or(usize::MAX)
    }
}

/// Builds the API router
///
/// `/health` is public; everything under `/files` passes through
/// [`auth::require_bearer`].
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.body_limit();

    let protected = Router::new()
        .route("/files", get(handlers::list_files))
        .route("/files/upload", post(handlers::upload_file))
        .route("/files/stats", get(handlers::get_stats))
        .route("/files/delete-batch", post(handlers::delete_batch))
        .route(
            "/files/:id",
            get(handlers::get_file)
                .put(handlers::update_content)
                .delete(handlers::delete_file),
        )
        .route("/files/:id/download", get(handlers::download_file))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
