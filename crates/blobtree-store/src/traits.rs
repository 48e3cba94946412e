use std::io::Read;

use blobtree_types::{FileInfo, StoragePath};

use crate::error::StorageResult;

/// A path-addressed blob storage backend.
///
/// Every path argument is a raw string; implementations normalize it before
/// touching any state. All implementations must satisfy these invariants:
/// - The root `/` always exists and is a directory.
/// - A path names at most one entry, either a file or a directory.
/// - Parent directories are created implicitly by writes.
/// - Each call is atomic on its own; sequences of calls are not.
pub trait StorageDriver: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Read the whole content of the file at `path`.
    fn get_content(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Replace the content of the file at `path`, creating it if needed.
    fn put_content(&self, path: &str, content: &[u8]) -> StorageResult<()>;

    /// Stream the content of the file at `path`, starting at `offset`.
    ///
    /// Negative offsets are rejected. An offset at or past the end yields an
    /// empty stream. The stream is a snapshot taken at call time.
    fn reader(&self, path: &str, offset: i64) -> StorageResult<Box<dyn Read + Send>>;

    /// Open a buffered write session on the file at `path`, creating it if
    /// needed. Unless `append` is set the existing content is truncated first.
    fn writer(&self, path: &str, append: bool) -> StorageResult<Box<dyn FileWriter>>;

    /// Metadata for the entry at `path`.
    fn stat(&self, path: &str) -> StorageResult<FileInfo>;

    /// Paths of the direct children of the directory at `path`.
    fn list(&self, path: &str) -> StorageResult<Vec<StoragePath>>;

    /// Move the entry at `src`, with its subtree, to `dst`.
    fn move_path(&self, src: &str, dst: &str) -> StorageResult<()>;

    /// Delete the entry at `path` and everything below it.
    fn delete(&self, path: &str) -> StorageResult<()>;

    /// A URL the content can be fetched from directly, if the backend
    /// supports redirects.
    fn redirect_url(&self, _path: &str) -> StorageResult<Option<String>> {
        Ok(None)
    }
}

/// A staged write against one file.
///
/// Writes accumulate in a private buffer; nothing reaches the file until the
/// session is closed or committed.
pub trait FileWriter: Send {
    /// Stage `data`. Returns the number of bytes staged.
    fn write(&mut self, data: &[u8]) -> StorageResult<usize>;

    /// Persisted length of the target file, excluding staged bytes.
    fn size(&self) -> StorageResult<u64>;

    /// Flush staged bytes and close the session. Allowed once.
    fn close(&mut self) -> StorageResult<()>;

    /// Flush staged bytes and mark the session committed.
    fn commit(&mut self) -> StorageResult<()>;

    /// Abandon the session and delete the target file.
    fn cancel(&mut self) -> StorageResult<()>;
}
