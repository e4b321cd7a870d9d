//! Scoped ownership of a lock file.

use std::fs;
use std::path::{Path, PathBuf};

/// Holds a lock until dropped, then deletes its file.
///
/// A file that cannot be removed is reported with `tracing::warn!` and left
/// for `agentry lock clear`.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    pub(super) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(lock = %self.path.display(), "lock released"),
            Err(e) => tracing::warn!(
                lock = %self.path.display(),
                error = %e,
                "lock file left behind; clear it with `agentry lock clear --force`"
            ),
        }
    }
}
