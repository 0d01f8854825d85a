//! FileVault Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `FileRecord`, `User`, `UserStats`, and the error taxonomy
//! - **Content hashing** - streaming SHA-256 digests rendered as lowercase hex
//! - **Port definitions** - Traits for adapters: `IBlobStore`, `IMetadataStore`, `IUserDirectory`
//! - **Use cases** - `FileService`, the upload/update orchestrator built on an explicit saga
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod hashing;
pub mod ports;
pub mod usecases;
