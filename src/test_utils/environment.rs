//! Isolated cache and docset directories for tests.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use crate::cache::AppData;
use crate::cache::lock::LockOptions;
use crate::lockfile::DependencyLock;
use crate::restore::RestoreGitMap;

/// A temporary app data root and docset.
///
/// ```text
/// {temp}/
/// ├── appdata/   # AppData root
/// └── docset/    # docset root folder dependencies resolve against
/// ```
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub docset_dir: PathBuf,
    pub app_data_dir: PathBuf,
}

impl TestEnvironment {
    /// Creates both directories.
    pub fn new() -> Result<Self> {
        super::init_test_logging(None);

        let temp_dir = TempDir::new()?;
        let docset_dir = temp_dir.path().join("docset");
        let app_data_dir = temp_dir.path().join("appdata");

        fs::create_dir_all(&docset_dir)?;
        fs::create_dir_all(&app_data_dir)?;

        Ok(Self {
            temp_dir,
            docset_dir,
            app_data_dir,
        })
    }

    /// The app data handle for this environment.
    pub fn app_data(&self) -> AppData {
        AppData::with_root(&self.app_data_dir)
    }

    /// Lock options with a short timeout, so a deadlocked test fails quickly.
    pub fn lock_options(&self) -> LockOptions {
        LockOptions::new(Duration::from_secs(5))
    }

    /// Records `commit` for `(url, branch)` in the store for `locale`.
    pub fn pin(&self, url: &str, branch: &str, commit: &str, locale: &str) -> Result<()> {
        let path = self.app_data().dependency_lock_file(&self.docset_dir, locale);
        let mut lock = DependencyLock::load(&path)?;
        lock.set_git_lock(url, branch, commit);
        lock.save(&path)
    }

    /// Creates the cache root and working tree for `url` as a restore would.
    pub fn materialize_worktree(&self, url: &str) -> Result<PathBuf> {
        let worktree = self.app_data().worktree_dir(url);
        fs::create_dir_all(&worktree)
            .with_context(|| format!("Failed to create {}", worktree.display()))?;
        Ok(worktree)
    }

    /// Creates a folder dependency under the docset.
    pub fn create_folder(&self, relative: impl AsRef<Path>) -> Result<PathBuf> {
        let path = self.docset_dir.join(relative);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// A resolution map over this environment's store.
    pub fn map(&self, locale: &str) -> Result<RestoreGitMap> {
        Ok(RestoreGitMap::create(self.app_data(), &self.docset_dir, locale, self.lock_options())?)
    }
}
