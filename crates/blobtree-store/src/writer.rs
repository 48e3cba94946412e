//! Buffered write sessions.
//!
//! A [`BufferedWriter`] stages bytes privately and only touches the tree when
//! it flushes, which happens on [`close`](FileWriter::close) and
//! [`commit`](FileWriter::commit). Each flush appends the whole buffer at the
//! target's end of content under the exclusive tree lock, then clears the
//! buffer, so repeated flushes accumulate.
//!
//! The session remembers the target by path and re-resolves it on every
//! flush. If the target was deleted or moved away in the meantime the flush
//! fails with [`StorageError::NotFound`] and nothing changes: the staged
//! bytes are kept and the session stays in its previous state. Cancellation
//! follows the same rule and only ever deletes a file.

use std::fmt;

use blobtree_types::StoragePath;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::memory::SharedTree;
use crate::traits::FileWriter;

/// Lifecycle state of a write session, as reported in errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Accepting writes.
    Open,
    /// Flushed and committed.
    Committed,
    /// Abandoned; the target file was deleted.
    Cancelled,
    /// Closed. Takes precedence over the other states when reporting.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Committed => write!(f, "already committed"),
            Self::Cancelled => write!(f, "already cancelled"),
            Self::Closed => write!(f, "already closed"),
        }
    }
}

/// A write session bound to one file in an in-memory tree.
pub struct BufferedWriter {
    tree: SharedTree,
    path: StoragePath,
    buffer: Vec<u8>,
    state: SessionState,
    closed: bool,
}

impl BufferedWriter {
    pub(crate) fn new(tree: SharedTree, path: StoragePath, capacity: usize) -> Self {
        Self {
            tree,
            path,
            buffer: Vec::with_capacity(capacity),
            state: SessionState::Open,
            closed: false,
        }
    }

    /// The target file's path.
    pub fn path(&self) -> &StoragePath {
        &self.path
    }

    pub fn state(&self) -> SessionState {
        if self.closed {
            SessionState::Closed
        } else {
            self.state
        }
    }

    /// Number of staged bytes not yet flushed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn reject(&self, op: &str) -> StorageError {
        let state = self.state();
        warn!(path = %self.path, %state, op, "write session call out of sequence");
        StorageError::InvalidSessionState {
            path: self.path.clone(),
            state,
        }
    }

    fn flush(&mut self) -> StorageResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let mut tree = self.tree.write()?;
        let file = tree.file_mut(&self.path)?;
        file.append(&self.buffer);
        debug!(path = %self.path, bytes = self.buffer.len(), size = file.len(), "flushed write buffer");
        self.buffer.clear();
        Ok(())
    }
}

impl FileWriter for BufferedWriter {
    fn write(&mut self, data: &[u8]) -> StorageResult<usize> {
        if self.closed || self.state != SessionState::Open {
            return Err(self.reject("write"));
        }
        self.buffer.extend_from_slice(data);
        Ok(data.len())
    }

    fn size(&self) -> StorageResult<u64> {
        let tree = self.tree.read()?;
        Ok(tree.file(&self.path)?.len())
    }

    fn close(&mut self) -> StorageResult<()> {
        if self.closed {
            return Err(self.reject("close"));
        }
        self.flush()?;
        self.closed = true;
        debug!(path = %self.path, "write session closed");
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        if self.closed || self.state != SessionState::Open {
            return Err(self.reject("commit"));
        }
        self.flush()?;
        self.state = SessionState::Committed;
        debug!(path = %self.path, "write session committed");
        Ok(())
    }

    fn cancel(&mut self) -> StorageResult<()> {
        if self.closed || self.state == SessionState::Committed {
            return Err(self.reject("cancel"));
        }
        let mut tree = self.tree.write()?;
        // Only the session's own file may go; a directory now at the path
        // belongs to someone else.
        tree.file(&self.path)?;
        tree.delete(&self.path)?;
        drop(tree);
        self.state = SessionState::Cancelled;
        self.buffer.clear();
        debug!(path = %self.path, "write session cancelled");
        Ok(())
    }
}

impl fmt::Debug for BufferedWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedWriter")
            .field("path", &self.path)
            .field("state", &self.state())
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDriver;
    use crate::traits::StorageDriver;

    fn driver_with(path: &str, content: &[u8]) -> InMemoryDriver {
        let driver = InMemoryDriver::new();
        driver.put_content(path, content).unwrap();
        driver
    }

    // -----------------------------------------------------------------------
    // Staging and flushing
    // -----------------------------------------------------------------------

    #[test]
    fn writes_are_invisible_until_commit() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        assert_eq!(w.write(b"abc").unwrap(), 3);
        assert_eq!(w.buffered(), 3);
        assert_eq!(w.size().unwrap(), 0);
        assert_eq!(driver.get_content("/f").unwrap(), b"");

        w.commit().unwrap();
        assert_eq!(w.size().unwrap(), 3);
        assert_eq!(w.buffered(), 0);
        assert_eq!(driver.get_content("/f").unwrap(), b"abc");
        assert_eq!(w.state(), SessionState::Committed);
    }

    #[test]
    fn append_mode_keeps_prior_content() {
        let driver = driver_with("/f", b"head-");
        let mut w = driver.open_writer("/f", true).unwrap();
        assert_eq!(w.size().unwrap(), 5);
        w.write(b"b1").unwrap();
        w.write(b"b2").unwrap();
        w.commit().unwrap();
        assert_eq!(driver.get_content("/f").unwrap(), b"head-b1b2");
    }

    #[test]
    fn truncating_mode_discards_prior_content() {
        let driver = driver_with("/f", b"old content");
        let mut w = driver.open_writer("/f", false).unwrap();
        w.write(b"b1").unwrap();
        w.write(b"b2").unwrap();
        w.commit().unwrap();
        assert_eq!(driver.get_content("/f").unwrap(), b"b1b2");
    }

    #[test]
    fn close_flushes() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        w.write(b"closed data").unwrap();
        w.close().unwrap();
        assert_eq!(driver.get_content("/f").unwrap(), b"closed data");
        assert_eq!(w.state(), SessionState::Closed);
    }

    #[test]
    fn commit_then_close_is_allowed() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        w.write(b"x").unwrap();
        w.commit().unwrap();
        w.close().unwrap();
        assert_eq!(driver.get_content("/f").unwrap(), b"x");
    }

    #[test]
    fn concurrent_sessions_append_cumulatively() {
        let driver = InMemoryDriver::new();
        let mut a = driver.open_writer("/f", true).unwrap();
        let mut b = driver.open_writer("/f", true).unwrap();
        a.write(b"aaa").unwrap();
        b.write(b"bb").unwrap();
        b.commit().unwrap();
        a.commit().unwrap();
        assert_eq!(driver.get_content("/f").unwrap(), b"bbaaa");
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    #[test]
    fn cancel_removes_new_file() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/dir/f", false).unwrap();
        w.write(b"never").unwrap();
        w.cancel().unwrap();
        assert!(driver.stat("/dir/f").unwrap_err().is_not_found());
        assert!(driver.stat("/dir").unwrap().is_dir);
        assert_eq!(w.state(), SessionState::Cancelled);
    }

    #[test]
    fn cancel_removes_pre_existing_file() {
        let driver = driver_with("/f", b"committed before");
        let mut w = driver.open_writer("/f", true).unwrap();
        w.write(b"more").unwrap();
        w.cancel().unwrap();
        assert!(driver.stat("/f").unwrap_err().is_not_found());
    }

    #[test]
    fn cancel_twice_reports_missing_target() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        w.cancel().unwrap();
        assert!(w.cancel().unwrap_err().is_not_found());
    }

    #[test]
    fn close_after_cancel_is_noop() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        w.write(b"x").unwrap();
        w.cancel().unwrap();
        w.close().unwrap();
        assert!(driver.stat("/f").unwrap_err().is_not_found());
    }

    // -----------------------------------------------------------------------
    // Out-of-sequence calls
    // -----------------------------------------------------------------------

    fn assert_session_state(err: StorageError, expected: SessionState) {
        match err {
            StorageError::InvalidSessionState { state, .. } => assert_eq!(state, expected),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn commit_twice_fails_and_keeps_content() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        w.write(b"once").unwrap();
        w.commit().unwrap();
        assert_session_state(w.commit().unwrap_err(), SessionState::Committed);
        assert_eq!(driver.get_content("/f").unwrap(), b"once");
    }

    #[test]
    fn write_after_close_fails() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        w.write(b"a").unwrap();
        w.close().unwrap();
        assert_session_state(w.write(b"b").unwrap_err(), SessionState::Closed);
        assert_eq!(w.buffered(), 0);
        assert_eq!(driver.get_content("/f").unwrap(), b"a");
    }

    #[test]
    fn close_twice_fails() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        w.close().unwrap();
        assert_session_state(w.close().unwrap_err(), SessionState::Closed);
    }

    #[test]
    fn commit_after_close_fails() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        w.close().unwrap();
        assert_session_state(w.commit().unwrap_err(), SessionState::Closed);
        assert_session_state(w.cancel().unwrap_err(), SessionState::Closed);
    }

    #[test]
    fn write_and_commit_after_cancel_fail() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        w.cancel().unwrap();
        assert_session_state(w.write(b"x").unwrap_err(), SessionState::Cancelled);
        assert_session_state(w.commit().unwrap_err(), SessionState::Cancelled);
    }

    #[test]
    fn cancel_after_commit_fails_and_keeps_file() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        w.write(b"kept").unwrap();
        w.commit().unwrap();
        assert_session_state(w.cancel().unwrap_err(), SessionState::Committed);
        assert_eq!(driver.get_content("/f").unwrap(), b"kept");
    }

    // -----------------------------------------------------------------------
    // Target re-resolution
    // -----------------------------------------------------------------------

    #[test]
    fn flush_to_vanished_target_changes_nothing() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        w.write(b"pending").unwrap();
        driver.delete("/f").unwrap();

        assert!(w.commit().unwrap_err().is_not_found());
        assert_eq!(w.state(), SessionState::Open);
        assert_eq!(w.buffered(), 7);
        assert!(driver.stat("/f").unwrap_err().is_not_found());

        driver.put_content("/f", b"new:").unwrap();
        w.commit().unwrap();
        assert_eq!(driver.get_content("/f").unwrap(), b"new:pending");
    }

    #[test]
    fn flush_onto_directory_fails() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        w.write(b"x").unwrap();
        driver.delete("/f").unwrap();
        driver.put_content("/f/child", b"y").unwrap();
        assert!(matches!(w.close(), Err(StorageError::NotAFile { .. })));
        assert_eq!(w.state(), SessionState::Open);
    }

    #[test]
    fn cancel_leaves_directory_at_target_alone() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        w.write(b"x").unwrap();
        driver.delete("/f").unwrap();
        driver.put_content("/f/child", b"y").unwrap();

        assert!(matches!(w.cancel(), Err(StorageError::NotAFile { .. })));
        assert_eq!(driver.get_content("/f/child").unwrap(), b"y");
        assert_eq!(w.state(), SessionState::Open);
        assert_eq!(w.buffered(), 1);
    }

    #[test]
    fn cancel_on_poisoned_lock_keeps_session() {
        let driver = InMemoryDriver::new();
        let mut w = driver.open_writer("/f", false).unwrap();
        w.write(b"x").unwrap();
        let tree = w.tree.clone();
        let _ = std::thread::spawn(move || {
            let _guard = tree.write().unwrap();
            panic!("poison the tree lock");
        })
        .join();

        assert!(matches!(w.cancel(), Err(StorageError::Poisoned)));
        assert_eq!(w.state(), SessionState::Open);
        assert_eq!(w.buffered(), 1);
    }

    #[test]
    fn debug_format() {
        let driver = InMemoryDriver::new();
        let w = driver.open_writer("/f", false).unwrap();
        let debug = format!("{w:?}");
        assert!(debug.contains("BufferedWriter"));
        assert!(debug.contains("Open"));
    }
}
