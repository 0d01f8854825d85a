//! Integration tests for filevault-client
//!
//! Uses wiremock to simulate a FileVault server and verifies envelope
//! handling, uploads, downloads, and a full folder sync over HTTP.

mod common;

mod test_download;
mod test_files;
mod test_sync;
