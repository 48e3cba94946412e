use blobtree_types::StoragePath;

use crate::writer::SessionState;

/// Errors from storage driver operations.
///
/// Every variant is a recoverable, data-level condition. None of them are
/// retried internally.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No entry exists at the exact requested path.
    #[error("path not found: {path}")]
    NotFound { path: StoragePath },

    /// A file was required but a directory was found, or a file blocked
    /// descent toward the requested path.
    #[error("not a file: {path}")]
    NotAFile { path: StoragePath },

    /// A directory was required but a file was found.
    #[error("not a directory: {path}")]
    NotADirectory { path: StoragePath },

    /// Read offsets must be non-negative.
    #[error("invalid offset {offset} for {path}")]
    InvalidOffset { path: StoragePath, offset: i64 },

    /// The request is structurally impossible, e.g. deleting the root.
    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: StoragePath, reason: String },

    /// A write session call arrived out of sequence.
    #[error("write session for {path} is {state}")]
    InvalidSessionState {
        path: StoragePath,
        state: SessionState,
    },

    /// A thread panicked while holding the tree lock.
    #[error("tree lock poisoned")]
    Poisoned,

    /// Driver configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl StorageError {
    /// Returns `true` for [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
