//! Node model: the two entity kinds that make up the tree.
//!
//! A [`Directory`] exclusively owns its children through a name-keyed map, so
//! the tree is acyclic by construction and every node has exactly one
//! parent. Nodes do not store their own path; a node's path is the sequence
//! of names walked from the root to reach it, which keeps moves a simple
//! detach-and-attach of a subtree.

use std::collections::BTreeMap;

use blobtree_types::{FileInfo, StoragePath};
use chrono::{DateTime, Utc};

/// An entry in the tree: either a directory or a file.
#[derive(Clone, Debug)]
pub enum Node {
    Directory(Directory),
    File(File),
}

impl Node {
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        match self {
            Self::Directory(dir) => dir.modified(),
            Self::File(file) => file.modified(),
        }
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Self::File(file) => Some(file),
            Self::Directory(_) => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut File> {
        match self {
            Self::File(file) => Some(file),
            Self::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Self::Directory(dir) => Some(dir),
            Self::File(_) => None,
        }
    }

    pub fn as_directory_mut(&mut self) -> Option<&mut Directory> {
        match self {
            Self::Directory(dir) => Some(dir),
            Self::File(_) => None,
        }
    }

    /// Stat metadata for this node, given the path it was reached by.
    pub fn info(&self, path: StoragePath) -> FileInfo {
        match self {
            Self::Directory(dir) => FileInfo::directory(path, dir.modified()),
            Self::File(file) => FileInfo::file(path, file.len(), file.modified()),
        }
    }
}

/// A directory: a mapping from child name to owned child node.
#[derive(Clone, Debug)]
pub struct Directory {
    children: BTreeMap<String, Node>,
    modified: DateTime<Utc>,
}

impl Directory {
    pub fn new() -> Self {
        Self {
            children: BTreeMap::new(),
            modified: Utc::now(),
        }
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.get_mut(name)
    }

    /// Child names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Attach `node` under `name`, replacing and returning any previous
    /// occupant. Counts as a membership change.
    pub(crate) fn insert(&mut self, name: &str, node: Node) -> Option<Node> {
        self.modified = Utc::now();
        self.children.insert(name.to_string(), node)
    }

    /// Detach and return the child called `name`. The directory's own
    /// timestamp is left alone.
    pub(crate) fn remove(&mut self, name: &str) -> Option<Node> {
        self.children.remove(name)
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

/// A file: an owned, growable byte buffer.
#[derive(Clone, Debug)]
pub struct File {
    content: Vec<u8>,
    modified: DateTime<Utc>,
}

impl File {
    pub fn new() -> Self {
        Self {
            content: Vec::new(),
            modified: Utc::now(),
        }
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Content length in bytes.
    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Content from `offset` to the end. Empty when `offset` is at or past
    /// the end.
    pub fn content_from(&self, offset: u64) -> &[u8] {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.content.len());
        &self.content[start..]
    }

    /// Drop all content.
    pub fn truncate(&mut self) {
        self.content.clear();
        self.modified = Utc::now();
    }

    /// Append `data` at the current end of content. Appending nothing does
    /// not count as a modification.
    pub fn append(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.content.extend_from_slice(data);
        self.modified = Utc::now();
    }
}

impl Default for File {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_file_is_empty() {
        let file = File::new();
        assert!(file.is_empty());
        assert_eq!(file.len(), 0);
    }

    #[test]
    fn append_is_cumulative() {
        let mut file = File::new();
        file.append(b"hello ");
        file.append(b"world");
        assert_eq!(file.content(), b"hello world");
        assert_eq!(file.len(), 11);
    }

    #[test]
    fn append_updates_modified() {
        let mut file = File::new();
        file.modified = DateTime::<Utc>::UNIX_EPOCH;
        file.append(b"");
        assert_eq!(file.modified(), DateTime::<Utc>::UNIX_EPOCH);
        file.append(b"x");
        assert!(file.modified() > DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn truncate_updates_modified() {
        let mut file = File::new();
        file.modified = DateTime::<Utc>::UNIX_EPOCH;
        file.truncate();
        assert!(file.modified() > DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn insert_touches_directory_but_remove_does_not() {
        let mut dir = Directory::new();
        dir.modified = DateTime::<Utc>::UNIX_EPOCH;
        dir.insert("x", Node::File(File::new()));
        let touched = dir.modified();
        assert!(touched > DateTime::<Utc>::UNIX_EPOCH);

        dir.modified = DateTime::<Utc>::UNIX_EPOCH;
        assert!(dir.remove("x").is_some());
        assert_eq!(dir.modified(), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn truncate_clears_content() {
        let mut file = File::new();
        file.append(b"data");
        file.truncate();
        assert!(file.is_empty());
    }

    #[test]
    fn content_from_clamps_offset() {
        let mut file = File::new();
        file.append(b"abcdef");
        assert_eq!(file.content_from(0), b"abcdef");
        assert_eq!(file.content_from(4), b"ef");
        assert_eq!(file.content_from(6), b"");
        assert_eq!(file.content_from(100), b"");
    }

    #[test]
    fn directory_names_are_sorted() {
        let mut dir = Directory::new();
        dir.insert("b", Node::File(File::new()));
        dir.insert("a", Node::File(File::new()));
        dir.insert("c", Node::Directory(Directory::new()));
        assert_eq!(dir.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(dir.len(), 3);
    }

    #[test]
    fn insert_replaces_existing_child() {
        let mut dir = Directory::new();
        assert!(dir.insert("x", Node::File(File::new())).is_none());
        let previous = dir.insert("x", Node::Directory(Directory::new()));
        assert!(matches!(previous, Some(Node::File(_))));
        assert!(dir.child("x").unwrap().is_directory());
    }

    #[test]
    fn remove_detaches_child() {
        let mut dir = Directory::new();
        dir.insert("x", Node::File(File::new()));
        assert!(dir.remove("x").is_some());
        assert!(dir.remove("x").is_none());
        assert!(dir.is_empty());
    }

    #[test]
    fn info_reflects_kind() {
        let mut file = File::new();
        file.append(b"12345");
        let info = Node::File(file).info(StoragePath::new("/f"));
        assert!(!info.is_dir);
        assert_eq!(info.size, 5);

        let info = Node::Directory(Directory::new()).info(StoragePath::new("/d"));
        assert!(info.is_dir);
        assert_eq!(info.size, 0);
    }
}
