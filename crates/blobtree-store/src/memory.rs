use std::io::Read;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use blobtree_types::{normalize, FileInfo, StoragePath};
use bytes::{Buf, Bytes};
use tracing::debug;

use crate::config::DriverConfig;
use crate::error::{StorageError, StorageResult};
use crate::traits::{FileWriter, StorageDriver};
use crate::tree::Tree;
use crate::writer::BufferedWriter;

/// The tree plus the single reader/writer lock that guards all of it.
///
/// Cloning shares the same tree; write sessions hold a clone so their
/// flushes serialize with every other mutation.
#[derive(Clone, Default)]
pub(crate) struct SharedTree(Arc<RwLock<Tree>>);

impl SharedTree {
    pub(crate) fn read(&self) -> StorageResult<RwLockReadGuard<'_, Tree>> {
        self.0.read().map_err(|_| StorageError::Poisoned)
    }

    pub(crate) fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Tree>> {
        self.0.write().map_err(|_| StorageError::Poisoned)
    }
}

/// In-memory, tree-backed storage driver.
///
/// Intended for tests and embedding. Nothing survives the driver being
/// dropped. Lookups take the tree lock shared, mutations take it exclusive,
/// so concurrent readers never block each other and a reader never observes
/// a half-applied write.
pub struct InMemoryDriver {
    tree: SharedTree,
    config: DriverConfig,
}

impl InMemoryDriver {
    /// Create an empty driver with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DriverConfig::default())
    }

    /// Create an empty driver with the given configuration.
    pub fn with_config(config: DriverConfig) -> Self {
        Self {
            tree: SharedTree::default(),
            config,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Open a write session, returning the concrete writer type.
    ///
    /// Same semantics as [`StorageDriver::writer`].
    pub fn open_writer(&self, path: &str, append: bool) -> StorageResult<BufferedWriter> {
        let path = normalize(path);
        debug!(path = %path, append, "open writer");
        {
            let mut tree = self.tree.write()?;
            let file = tree.mkfile(&path)?;
            if !append {
                file.truncate();
            }
        }
        Ok(BufferedWriter::new(
            self.tree.clone(),
            path,
            self.config.write_buffer_capacity,
        ))
    }

    /// Discard every entry, leaving only an empty root.
    pub fn clear(&self) -> StorageResult<()> {
        *self.tree.write()? = Tree::new();
        debug!("cleared tree");
        Ok(())
    }
}

impl Default for InMemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageDriver for InMemoryDriver {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn get_content(&self, path: &str) -> StorageResult<Vec<u8>> {
        let path = normalize(path);
        debug!(path = %path, "get content");
        let tree = self.tree.read()?;
        Ok(tree.file(&path)?.content().to_vec())
    }

    fn put_content(&self, path: &str, content: &[u8]) -> StorageResult<()> {
        let path = normalize(path);
        debug!(path = %path, len = content.len(), "put content");
        let mut tree = self.tree.write()?;
        let file = tree.mkfile(&path)?;
        file.truncate();
        file.append(content);
        Ok(())
    }

    fn reader(&self, path: &str, offset: i64) -> StorageResult<Box<dyn Read + Send>> {
        let path = normalize(path);
        debug!(path = %path, offset, "open reader");
        let start = u64::try_from(offset)
            .map_err(|_| StorageError::InvalidOffset {
                path: path.clone(),
                offset,
            })?;
        let tree = self.tree.read()?;
        let snapshot = Bytes::copy_from_slice(tree.file(&path)?.content_from(start));
        Ok(Box::new(snapshot.reader()))
    }

    fn writer(&self, path: &str, append: bool) -> StorageResult<Box<dyn FileWriter>> {
        Ok(Box::new(self.open_writer(path, append)?))
    }

    fn stat(&self, path: &str) -> StorageResult<FileInfo> {
        let path = normalize(path);
        debug!(path = %path, "stat");
        self.tree.read()?.stat(&path)
    }

    fn list(&self, path: &str) -> StorageResult<Vec<StoragePath>> {
        let path = normalize(path);
        debug!(path = %path, "list");
        self.tree.read()?.list(&path)
    }

    fn move_path(&self, src: &str, dst: &str) -> StorageResult<()> {
        let (src, dst) = (normalize(src), normalize(dst));
        debug!(src = %src, dst = %dst, "move");
        self.tree.write()?.move_node(&src, &dst)
    }

    fn delete(&self, path: &str) -> StorageResult<()> {
        let path = normalize(path);
        debug!(path = %path, "delete");
        self.tree.write()?.delete(&path)?;
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDriver")
            .field("name", &self.config.name)
            .finish()
    }
}
