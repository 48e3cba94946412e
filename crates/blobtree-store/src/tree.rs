//! The tree engine: structural algorithms over the node model.
//!
//! All traversal is top-down, one path segment at a time, starting at the
//! root. The tree itself holds no lock; [`InMemoryDriver`] wraps it in a
//! single `RwLock` and every method here runs under that lock.
//!
//! [`InMemoryDriver`]: crate::memory::InMemoryDriver

use blobtree_types::{normalize, FileInfo, StoragePath};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::node::{Directory, File, Node};

/// Outcome of [`Tree::find`].
#[derive(Debug)]
pub enum Lookup<'a> {
    /// The exact path was reached.
    Found(&'a Node),
    /// The walk stopped early. `deepest` is the path of the last node
    /// reached: either its next segment is missing, or it is a file and
    /// blocks further descent. Only useful for diagnostics.
    Missing { deepest: StoragePath },
}

impl<'a> Lookup<'a> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn node(&self) -> Option<&'a Node> {
        match self {
            Self::Found(node) => Some(*node),
            Self::Missing { .. } => None,
        }
    }
}

/// A rooted tree of directories and files.
///
/// The root is always a directory at `/`; no operation can delete, move or
/// replace it.
#[derive(Clone, Debug)]
pub struct Tree {
    root: Node,
}

impl Tree {
    /// Create a tree holding only an empty root directory.
    pub fn new() -> Self {
        Self {
            root: Node::Directory(Directory::new()),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Walk toward `path`, stopping at the deepest node reachable.
    pub fn find(&self, path: &StoragePath) -> Lookup<'_> {
        let mut node = &self.root;
        for (depth, segment) in path.segments().enumerate() {
            let next = match node {
                Node::Directory(dir) => dir.child(segment),
                Node::File(_) => None,
            };
            match next {
                Some(child) => node = child,
                None => {
                    return Lookup::Missing {
                        deepest: prefix(path, depth),
                    }
                }
            }
        }
        Lookup::Found(node)
    }

    /// Stat the node at `path`.
    pub fn stat(&self, path: &StoragePath) -> StorageResult<FileInfo> {
        match self.find(path) {
            Lookup::Found(node) => Ok(node.info(path.clone())),
            Lookup::Missing { .. } => Err(StorageError::NotFound { path: path.clone() }),
        }
    }

    /// The file at `path`.
    pub fn file(&self, path: &StoragePath) -> StorageResult<&File> {
        match self.find(path) {
            Lookup::Found(Node::File(file)) => Ok(file),
            Lookup::Found(Node::Directory(_)) => {
                Err(StorageError::NotAFile { path: path.clone() })
            }
            Lookup::Missing { .. } => Err(StorageError::NotFound { path: path.clone() }),
        }
    }

    /// The file at `path`, for in-place mutation. Never creates anything.
    pub fn file_mut(&mut self, path: &StoragePath) -> StorageResult<&mut File> {
        match self.node_mut(path) {
            Some(Node::File(file)) => Ok(file),
            Some(Node::Directory(_)) => Err(StorageError::NotAFile { path: path.clone() }),
            None => Err(StorageError::NotFound { path: path.clone() }),
        }
    }

    /// Return the file at `path`, creating it and any missing parent
    /// directories first.
    ///
    /// Fails with [`StorageError::NotAFile`] if `path` names a directory or
    /// if a file sits where a parent directory is needed. A failed call
    /// leaves the tree unchanged.
    pub fn mkfile(&mut self, path: &StoragePath) -> StorageResult<&mut File> {
        let (parent, name) = split(path)
            .ok_or_else(|| StorageError::NotAFile { path: path.clone() })?;
        let dir = self.mkdirs(&parent, path)?;
        if dir.child(name).is_none() {
            debug!(path = %path, "creating file");
            dir.insert(name, Node::File(File::new()));
        }
        match dir.child_mut(name) {
            Some(Node::File(file)) => Ok(file),
            _ => Err(StorageError::NotAFile { path: path.clone() }),
        }
    }

    /// Remove the node at `path` together with its subtree, returning it.
    pub fn delete(&mut self, path: &StoragePath) -> StorageResult<Node> {
        let (parent, name) = split(path).ok_or_else(|| StorageError::InvalidPath {
            path: path.clone(),
            reason: "the root cannot be deleted".into(),
        })?;
        let removed = self
            .node_mut(&parent)
            .and_then(Node::as_directory_mut)
            .and_then(|dir| dir.remove(name))
            .ok_or_else(|| StorageError::NotFound { path: path.clone() })?;
        debug!(path = %path, is_dir = removed.is_directory(), "deleted node");
        Ok(removed)
    }

    /// Relocate the subtree at `src` to `dst`.
    ///
    /// Missing directories along `dst` are created. Whatever already lives
    /// at `dst` is replaced. Moving a path onto itself is a no-op.
    pub fn move_node(&mut self, src: &StoragePath, dst: &StoragePath) -> StorageResult<()> {
        if src.is_root() {
            return Err(StorageError::InvalidPath {
                path: src.clone(),
                reason: "the root cannot be moved".into(),
            });
        }
        if !self.find(src).is_found() {
            return Err(StorageError::NotFound { path: src.clone() });
        }
        if src == dst {
            return Ok(());
        }
        if src.is_ancestor_of(dst) {
            return Err(StorageError::InvalidPath {
                path: dst.clone(),
                reason: format!("destination lies inside {src}"),
            });
        }
        let (dst_parent, dst_name) = split(dst).ok_or_else(|| StorageError::InvalidPath {
            path: dst.clone(),
            reason: "the root cannot be replaced".into(),
        })?;

        // Materialize the destination parent before detaching anything, so
        // a blocked destination leaves the source where it was.
        self.mkdirs(&dst_parent, dst)?;
        let node = self.delete(src)?;
        // `dst_parent` is not inside `src`, so detaching cannot remove it.
        let dir = self
            .node_mut(&dst_parent)
            .and_then(Node::as_directory_mut)
            .ok_or_else(|| StorageError::NotFound {
                path: dst_parent.clone(),
            })?;
        if dir.insert(dst_name, node).is_some() {
            debug!(path = %dst, "move replaced existing node");
        }
        debug!(src = %src, dst = %dst, "moved node");
        Ok(())
    }

    /// Full paths of the direct children of the directory at `path`, sorted
    /// by name.
    pub fn list(&self, path: &StoragePath) -> StorageResult<Vec<StoragePath>> {
        match self.find(path) {
            Lookup::Found(Node::Directory(dir)) => Ok(dir.names().map(|n| path.join(n)).collect()),
            Lookup::Found(Node::File(_)) => {
                Err(StorageError::NotADirectory { path: path.clone() })
            }
            Lookup::Missing { .. } => Err(StorageError::NotFound { path: path.clone() }),
        }
    }

    fn node_mut(&mut self, path: &StoragePath) -> Option<&mut Node> {
        let mut node = &mut self.root;
        for segment in path.segments() {
            node = match node {
                Node::Directory(dir) => dir.child_mut(segment)?,
                Node::File(_) => return None,
            };
        }
        Some(node)
    }

    /// Walk to the directory at `path`, creating missing directories on the
    /// way. Errors name `target`, the path the caller actually asked for.
    ///
    /// Once a segment is missing every deeper one is too, so a file can only
    /// be hit before anything has been created.
    fn mkdirs(&mut self, path: &StoragePath, target: &StoragePath) -> StorageResult<&mut Directory> {
        let not_a_file = || StorageError::NotAFile {
            path: target.clone(),
        };
        let mut dir = self.root.as_directory_mut().ok_or_else(not_a_file)?;
        for (depth, segment) in path.segments().enumerate() {
            if dir.child(segment).is_none() {
                debug!(path = %prefix(path, depth + 1), "creating directory");
                dir.insert(segment, Node::Directory(Directory::new()));
            }
            dir = match dir.child_mut(segment) {
                Some(Node::Directory(next)) => next,
                _ => return Err(not_a_file()),
            };
        }
        Ok(dir)
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a non-root path into its parent and final segment.
fn split(path: &StoragePath) -> Option<(StoragePath, &str)> {
    Some((path.parent()?, path.file_name()?))
}

/// The first `depth` segments of `path`.
fn prefix(path: &StoragePath, depth: usize) -> StoragePath {
    let segments: Vec<&str> = path.segments().take(depth).collect();
    normalize(&segments.join("/"))
}
