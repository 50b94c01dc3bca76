//! Advisory inter-process marker-file lock (spec.md §4.2).
//!
//! Two flavors share this one mechanism: a **flush lock**, held for the
//! duration of a writable session (its presence on startup signals a prior
//! crash and triggers recovery), and a **process lock**, held for the
//! store's entire lifetime to exclude other processes.

use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorKind, Result};
use crate::file::utilities;

/// A marker-file lock. Construction does not touch the file.
pub struct FileLock {
    file: PathBuf,
}

impl FileLock {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        FileLock { file: file.into() }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn exists(&self) -> bool {
        utilities::is_file(&self.file)
    }

    /// True if the file did not exist and is now created.
    pub fn create(&self) -> bool {
        if self.exists() {
            return false;
        }
        utilities::create_file(&self.file)
    }

    /// True if the file was removed (or was already absent).
    pub fn destroy(&self) -> bool {
        if !self.exists() {
            return true;
        }
        std::fs::remove_file(&self.file).is_ok()
    }
}

/// Acquire `lock`, returning a guard that destroys it on drop.
///
/// Failure to acquire is fatal to store startup (spec.md §4.2).
pub struct LockGuard<'a> {
    lock: &'a FileLock,
}

impl<'a> LockGuard<'a> {
    pub fn acquire(lock: &'a FileLock) -> Result<Self> {
        if !lock.create() {
            log::error!("failed to acquire lock at {}", lock.file().display());
            return Err(Error::new(ErrorKind::LockFailure));
        }
        Ok(LockGuard { lock })
    }
}

impl<'a> Drop for LockGuard<'a> {
    fn drop(&mut self) {
        if !self.lock.destroy() {
            log::warn!("failed to release lock at {}", self.lock.file().display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_destroy_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let lock = FileLock::new(dir.path().join("flush.lock"));
        assert!(!lock.exists());
        assert!(lock.create());
        assert!(lock.exists());
        assert!(!lock.create(), "second create must fail: already held");
        assert!(lock.destroy());
        assert!(!lock.exists());
    }

    #[test]
    fn guard_releases_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let lock = FileLock::new(dir.path().join("process.lock"));
        {
            let _guard = LockGuard::acquire(&lock).unwrap();
            assert!(lock.exists());
        }
        assert!(!lock.exists());
    }

    #[test]
    fn double_acquire_fails() {
        let dir = tempfile::tempdir().unwrap();
        let lock = FileLock::new(dir.path().join("process.lock"));
        let _guard = LockGuard::acquire(&lock).unwrap();
        assert!(LockGuard::acquire(&lock).is_err());
    }
}
