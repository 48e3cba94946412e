//! Foundation types for blobtree.
//!
//! Every path that enters the store is canonicalized into a [`StoragePath`]
//! exactly once, at the driver boundary. From then on the normalized string
//! is the sole identity used for tree lookups.
//!
//! # Key Types
//!
//! - [`StoragePath`] -- Normalized absolute path (`/` separated, root is `/`)
//! - [`FileInfo`] -- Stat result: path, kind, modification time, size

pub mod info;
pub mod path;

pub use info::FileInfo;
pub use path::{normalize, StoragePath, SEPARATOR};
