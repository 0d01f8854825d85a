//! Sync planner: diff local files against the server listing
//!
//! Names are compared after Unicode NFC normalization, so a name typed on
//! one platform matches the same name decomposed by another. For each local
//! file:
//!
//! 1. a same-name server file with an equal hash makes it unchanged;
//! 2. otherwise the first same-name server file (in listing order) with a
//!    different hash is replaced;
//! 3. otherwise the file is uploaded as new.
//!
//! Server files without a local counterpart never produce an action.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use filevault_core::domain::{
    newtypes::{ContentHash, FileId},
    FileView,
};

use crate::scanner::LocalFile;

/// Reason attached to upload actions
pub const REASON_NEW_FILE: &str = "New file";
/// Reason attached to replace actions
pub const REASON_FILE_CHANGED: &str = "File changed";

/// What the planner needs to know about a server file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerFile {
    pub id: FileId,
    pub original_name: String,
    pub content_hash: ContentHash,
}

impl From<&FileView> for ServerFile {
    fn from(view: &FileView) -> Self {
        Self {
            id: view.id,
            original_name: view.original_name.clone(),
            content_hash: view.file_hash.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncActionKind {
    Upload,
    Replace,
}

/// One planned change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAction {
    pub kind: SyncActionKind,
    pub file_name: String,
    pub local_file: LocalFile,
    /// Server record to replace; set only for `Replace`
    pub server_file_id: Option<FileId>,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub total_local_files: usize,
    pub new_files: usize,
    pub replaced_files: usize,
    pub unchanged_files: usize,
}

/// Ordered actions plus their counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPlan {
    pub actions: Vec<SyncAction>,
    pub summary: SyncSummary,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

fn nfc(name: &str) -> String {
    name.nfc().collect()
}

/// Diffs `local` against `server`; actions follow the order of `local`
pub fn plan_sync(local: &[LocalFile], server: &[ServerFile]) -> SyncPlan {
    let mut by_name: HashMap<String, Vec<&ServerFile>> = HashMap::new();
    for file in server {
        by_name.entry(nfc(&file.original_name)).or_default().push(file);
    }

    let mut actions = Vec::new();
    let mut new_files = 0;
    let mut replaced_files = 0;

    for file in local {
        let candidates = by_name
            .get(&nfc(&file.name))
            .map(Vec::as_slice)
            .unwrap_or_default();

        if candidates.iter().any(|s| s.content_hash == file.hash) {
            continue;
        }

        match candidates.first() {
            Some(target) => {
                replaced_files += 1;
                actions.push(SyncAction {
                    kind: SyncActionKind::Replace,
                    file_name: file.name.clone(),
                    local_file: file.clone(),
                    server_file_id: Some(target.id),
                    reason: REASON_FILE_CHANGED.to_string(),
                });
            }
            None => {
                new_files += 1;
                actions.push(SyncAction {
                    kind: SyncActionKind::Upload,
                    file_name: file.name.clone(),
                    local_file: file.clone(),
                    server_file_id: None,
                    reason: REASON_NEW_FILE.to_string(),
                });
            }
        }
    }

    SyncPlan {
        actions,
        summary: SyncSummary {
            total_local_files: local.len(),
            new_files,
            replaced_files,
            unchanged_files: local.len() - new_files - replaced_files,
        },
    }
}
