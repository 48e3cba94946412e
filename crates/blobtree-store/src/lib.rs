//! In-memory, hierarchical blob storage.
//!
//! This crate implements a path-addressed storage driver whose whole state is
//! a tree of directories and files held in memory. It is a drop-in stand-in
//! for a durable backend: callers can exercise upload protocols, listing
//! semantics and retry paths without touching real storage.
//!
//! # Components
//!
//! - [`Node`] -- a [`Directory`] owning named children, or a [`File`] owning bytes
//! - [`Tree`] -- lookup, create-on-write, move, delete and list over the nodes
//! - [`BufferedWriter`] -- staged write session with commit/cancel/close
//! - [`InMemoryDriver`] -- the [`StorageDriver`] adapter guarding the tree
//!
//! # Design Rules
//!
//! 1. Paths are normalized once, at the driver boundary.
//! 2. One reader/writer lock guards the entire tree: lookups share it,
//!    mutations and session flushes hold it exclusively.
//! 3. Parent directories are created on demand by writes and moves.
//! 4. A failed operation leaves the tree exactly as it was.
//! 5. Session writes stay private until a flush appends them at end of file.

pub mod config;
pub mod error;
pub mod memory;
pub mod node;
pub mod traits;
pub mod tree;
pub mod writer;

// Re-export primary types at crate root for ergonomic imports.
pub use blobtree_types::{normalize, FileInfo, StoragePath};
pub use config::{DriverConfig, DRIVER_NAME};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryDriver;
pub use node::{Directory, File, Node};
pub use traits::{FileWriter, StorageDriver};
pub use tree::{Lookup, Tree};
pub use writer::{BufferedWriter, SessionState};
