//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IBlobStore`] - Raw file bytes in a per-owner namespace (filesystem adapter)
//! - [`IMetadataStore`] - File records with unit-of-work commits (SQLite adapter)
//! - [`IUserDirectory`] - Users and bearer-token resolution (SQLite adapter)

pub mod blob_store;
pub mod metadata_store;
pub mod user_directory;

pub use blob_store::{BlobReader, IBlobStore};
pub use metadata_store::{IMetadataStore, MetadataChange, UnitOfWork};
pub use user_directory::IUserDirectory;
