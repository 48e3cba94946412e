use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// A normalized, absolute storage path.
///
/// Every `StoragePath` starts with exactly one `/` and never ends with one,
/// except the root path which is exactly `/`. Empty segments are dropped, so
/// `//a///b/` and `a/b` both normalize to `/a/b`. Two paths name the same
/// entity iff their normalized strings are byte-for-byte equal.
///
/// `.` and `..` carry no special meaning: they are ordinary segment names.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct StoragePath(String);

/// Canonicalize an arbitrary path string.
///
/// Total and idempotent: `normalize(normalize(x).as_str()) == normalize(x)`.
///
/// ```
/// use blobtree_types::normalize;
///
/// assert_eq!(normalize("").as_str(), "/");
/// assert_eq!(normalize("a//b/").as_str(), "/a/b");
/// ```
pub fn normalize(raw: &str) -> StoragePath {
    let mut out = String::with_capacity(raw.len() + 1);
    for segment in raw.split(SEPARATOR).filter(|s| !s.is_empty()) {
        out.push(SEPARATOR);
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push(SEPARATOR);
    }
    StoragePath(out)
}

impl StoragePath {
    /// The root path, `/`.
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    /// Normalize `raw` into a path. Same as [`normalize`].
    pub fn new(raw: &str) -> Self {
        normalize(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// The segments below the root, outermost first. Empty for the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Number of segments below the root.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The enclosing directory path, or `None` for the root.
    pub fn parent(&self) -> Option<StoragePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
        }
    }

    /// The last segment, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit(SEPARATOR).next()
    }

    /// Append `name` below this path. `name` is normalized as well, so it
    /// may itself contain separators.
    pub fn join(&self, name: &str) -> StoragePath {
        normalize(&format!("{}{SEPARATOR}{name}", self.0))
    }

    /// Returns `true` if `self` is a strict ancestor of `other`.
    ///
    /// Comparison happens on segment boundaries: `/a` is an ancestor of
    /// `/a/b` but not of `/ab`, and no path is its own ancestor.
    pub fn is_ancestor_of(&self, other: &StoragePath) -> bool {
        if self.is_root() {
            return !other.is_root();
        }
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == SEPARATOR as u8
    }
}

impl Default for StoragePath {
    fn default() -> Self {
        Self::root()
    }
}

impl From<&str> for StoragePath {
    fn from(raw: &str) -> Self {
        normalize(raw)
    }
}

impl From<String> for StoragePath {
    fn from(raw: String) -> Self {
        normalize(&raw)
    }
}

impl From<StoragePath> for String {
    fn from(path: StoragePath) -> Self {
        path.0
    }
}

impl AsRef<str> for StoragePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoragePath({})", self.0)
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
