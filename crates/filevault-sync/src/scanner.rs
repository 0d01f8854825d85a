//! Local directory scanner
//!
//! Enumerates the regular files directly inside a directory (no recursion,
//! symlinks and sub-directories ignored), filters them by size and
//! extension, and hashes the survivors. The hashes are what the planner
//! compares against the server listing.
//!
//! The descriptors carry only `{name, size, hash}`. The path of each file
//! lives in a separate [`SyncSession`] side-table keyed by name, which the
//! executor consults when it needs the bytes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use filevault_core::config::ClientConfig;
use filevault_core::domain::newtypes::{normalized_extension, sanitize_file_name, ContentHash};
use filevault_core::hashing::hash_file;

use crate::SyncError;

/// Which local files take part in a sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPolicy {
    max_file_size_bytes: u64,
    allowed_extensions: Vec<String>,
}

impl ScanPolicy {
    pub fn new(max_file_size_bytes: u64, allowed_extensions: &[String]) -> Self {
        Self {
            max_file_size_bytes,
            allowed_extensions: allowed_extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.max_file_size_bytes(), &config.allowed_extensions)
    }

    /// A file qualifies when it is within the size limit, has a listed,
    /// non-empty extension, and keeps its name through the server's
    /// file-name sanitizing
    ///
    /// A name the server would rewrite (surrounding whitespace, a `\`) could
    /// never match its stored copy and would be uploaded again on every sync.
    pub fn accepts(&self, name: &str, size: u64) -> bool {
        if size > self.max_file_size_bytes {
            return false;
        }
        if sanitize_file_name(name).as_deref() != Some(name) {
            return false;
        }
        match normalized_extension(name) {
            Some(ext) => self.allowed_extensions.iter().any(|e| *e == ext),
            None => false,
        }
    }
}

/// A local file that passed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFile {
    pub name: String,
    pub size: u64,
    pub hash: ContentHash,
}

/// Side-table from file name to the path holding its bytes
#[derive(Debug, Clone, Default)]
pub struct SyncSession {
    paths: HashMap<String, PathBuf>,
}

impl SyncSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.paths.insert(name.into(), path.into());
    }

    pub fn path_for(&self, name: &str) -> Option<&Path> {
        self.paths.get(name).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Result of scanning one directory
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Valid files, sorted by name
    pub files: Vec<LocalFile>,
    pub session: SyncSession,
    /// Regular files found at the top level
    pub total_files: usize,
    /// Files that passed validation and hashing
    pub valid_files: usize,
    /// Files rejected by the policy or unreadable
    pub skipped: usize,
}

/// Scans the top level of `dir`
///
/// # Errors
///
/// Fails only when `dir` itself cannot be listed. Individual unreadable
/// files are skipped and counted.
#[instrument(skip(policy), fields(dir = %dir.display()))]
pub async fn scan_directory(dir: &Path, policy: &ScanPolicy) -> Result<ScanReport, SyncError> {
    let meta = match tokio::fs::metadata(dir).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SyncError::PathNotFound(dir.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    if !meta.is_dir() {
        return Err(SyncError::NotADirectory(dir.to_path_buf()));
    }

    let mut report = ScanReport::default();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let file_type = match entry.file_type().await {
            Ok(ft) => ft,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Cannot stat entry");
                continue;
            }
        };
        if !file_type.is_file() {
            continue;
        }
        report.total_files += 1;

        let path = entry.path();
        let Ok(name) = entry.file_name().into_string() else {
            warn!(path = %path.display(), "Skipping file with non-UTF-8 name");
            report.skipped += 1;
            continue;
        };

        let size = match entry.metadata().await {
            Ok(m) => m.len(),
            Err(e) => {
                warn!(file = %name, error = %e, "Cannot read file metadata");
                report.skipped += 1;
                continue;
            }
        };

        if !policy.accepts(&name, size) {
            debug!(file = %name, size, "File not eligible for sync");
            report.skipped += 1;
            continue;
        }

        match hash_file(&path).await {
            Ok((hash, hashed_len)) => {
                report.files.push(LocalFile {
                    name: name.clone(),
                    size: hashed_len,
                    hash,
                });
                report.session.insert(name, path);
            }
            Err(e) => {
                warn!(file = %name, error = %e, "Failed to hash file");
                report.skipped += 1;
            }
        }
    }

    report.files.sort_by(|a, b| a.name.cmp(&b.name));
    report.valid_files = report.files.len();

    info!(
        total = report.total_files,
        valid = report.valid_files,
        skipped = report.skipped,
        "Directory scanned"
    );
    Ok(report)
}
