//! Per-user storage statistics

use serde::{Deserialize, Serialize};

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Totals over all files owned by one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_files: u64,
    pub total_size_bytes: u64,
}

impl UserStats {
    pub fn new(total_files: u64, total_size_bytes: u64) -> Self {
        Self {
            total_files,
            total_size_bytes,
        }
    }

    pub fn formatted_size(&self) -> String {
        format_size(self.total_size_bytes)
    }
}

/// Renders a byte count with 1024-based units and at most two decimals
///
/// Trailing zeros are dropped: `1536` is `1.5 KB`, `2048` is `2 KB`.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}
