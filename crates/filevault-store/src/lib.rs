//! FileVault Store - Blob persistence on the local filesystem
//!
//! Implements the `IBlobStore` port from `filevault-core`. Blobs live at
//! `{root}/{owner_id}/{stored_name}`; every owner gets one directory.
//!
//! ## Key Components
//!
//! - [`FsBlobStore`] - `IBlobStore` backed by `tokio::fs`
//! - [`StoreError`] - Error type carrying the path an operation failed on

pub mod error;
pub mod fs_store;

pub use error::StoreError;
pub use fs_store::FsBlobStore;
