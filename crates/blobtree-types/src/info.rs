use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::StoragePath;

/// Metadata returned by a stat call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Normalized path of the entry.
    pub path: StoragePath,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Last time the entry's own content or direct membership changed.
    pub modified: DateTime<Utc>,
    /// Content length in bytes. Always zero for directories.
    pub size: u64,
}

impl FileInfo {
    /// Metadata for a file holding `size` bytes.
    pub fn file(path: StoragePath, size: u64, modified: DateTime<Utc>) -> Self {
        Self {
            path,
            is_dir: false,
            modified,
            size,
        }
    }

    /// Metadata for a directory.
    pub fn directory(path: StoragePath, modified: DateTime<Utc>) -> Self {
        Self {
            path,
            is_dir: true,
            modified,
            size: 0,
        }
    }

    pub fn is_file(&self) -> bool {
        !self.is_dir
    }
}
