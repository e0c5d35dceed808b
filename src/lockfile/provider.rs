//! Read-only access to the dependency lock of one docset and locale.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cache::AppData;
use crate::core::RestoreError;

use super::{DependencyGitLock, DependencyLock};

/// Answers "which commit is `(url, branch)` pinned to?" for a build.
///
/// Loaded once when a build starts and never mutated afterwards, so it can be
/// shared freely between concurrent resolutions.
#[derive(Debug, Clone, Default)]
pub struct DependencyLockProvider {
    lock: DependencyLock,
    path: Option<PathBuf>,
}

impl DependencyLockProvider {
    /// Loads the document stored for `docset_root` and `locale`.
    ///
    /// A docset that was never restored has no document and yields an empty
    /// provider; every git lookup then misses.
    pub fn create_from_store(
        app_data: &AppData,
        docset_root: &Path,
        locale: &str,
    ) -> Result<Self, RestoreError> {
        let path = app_data.dependency_lock_file(docset_root, locale);
        let lock = DependencyLock::load(&path)?;
        debug!(
            docset = %docset_root.display(),
            locale,
            entries = lock.len(),
            "Loaded dependency lock from {}",
            path.display()
        );
        Ok(Self {
            lock,
            path: Some(path),
        })
    }

    /// Wraps an in-memory document.
    #[must_use]
    pub const fn from_lock(lock: DependencyLock) -> Self {
        Self {
            lock,
            path: None,
        }
    }

    /// Pinned entry for exactly `(url, branch)`, without I/O.
    #[must_use]
    pub fn get_git_lock(&self, url: &str, branch: &str) -> Option<&DependencyGitLock> {
        self.lock.get_git_lock(url, branch)
    }

    /// The underlying document.
    #[must_use]
    pub const fn lock(&self) -> &DependencyLock {
        &self.lock
    }

    /// Where the document was loaded from, if it came from the store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
