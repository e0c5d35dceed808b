//! Resolving declared dependencies to restored paths during a build.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::cache::AppData;
use crate::cache::lock::{InterProcessReaderWriterLock, LockOptions};
use crate::core::{RestoreError, SourceInfo};
use crate::lockfile::DependencyLockProvider;
use crate::package::{PackagePath, RestoreGitFlags};

/// Shared lock on one cache root, acquired at most once per map.
type LockCell = Arc<OnceCell<Arc<InterProcessReaderWriterLock>>>;

/// Resolved location of a dependency: the directory, and for git dependencies
/// the pinned commit.
pub type ResolvedPath = (PathBuf, Option<String>);

/// Maps the dependencies of one docset build to directories on disk.
///
/// Folder dependencies resolve against the docset root. Git dependencies
/// resolve to the restored cache for their pinned commit, and the map takes a
/// shared lock on that cache so no restore can rewrite it mid-build. Locks
/// accumulate for the lifetime of the build and are released together by
/// [`release`](Self::release), or on drop.
///
/// Resolution is safe to call concurrently from many tasks: resolving two
/// dependencies that share a cache root acquires the OS lock once.
///
/// ```rust,no_run
/// use docrestore::cache::AppData;
/// use docrestore::cache::lock::LockOptions;
/// use docrestore::package::{PackagePath, RestoreGitFlags};
/// use docrestore::restore::RestoreGitMap;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let map = RestoreGitMap::create(AppData::new()?, Path::new("docs"), "en-us", LockOptions::default())?;
///
/// let package = PackagePath::git("https://github.com/org/templates", "main");
/// let (dir, commit) = map.get_restore_git_path(&package, RestoreGitFlags::NONE).await?;
/// println!("{} at {}", dir.display(), commit.unwrap_or_default());
///
/// map.release()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RestoreGitMap {
    docset_root: PathBuf,
    app_data: AppData,
    provider: DependencyLockProvider,
    options: LockOptions,
    locks: DashMap<PathBuf, LockCell>,
    acquisitions: AtomicUsize,
}

impl RestoreGitMap {
    /// Builds a map over an existing dependency lock provider.
    pub fn new(
        provider: DependencyLockProvider,
        docset_root: impl Into<PathBuf>,
        app_data: AppData,
        options: LockOptions,
    ) -> Self {
        Self {
            docset_root: docset_root.into(),
            app_data,
            provider,
            options,
            locks: DashMap::new(),
            acquisitions: AtomicUsize::new(0),
        }
    }

    /// Builds a map for `docset_root` and `locale`, loading their dependency
    /// lock from the store under `app_data`.
    pub fn create(
        app_data: AppData,
        docset_root: impl AsRef<Path>,
        locale: &str,
        options: LockOptions,
    ) -> Result<Self, RestoreError> {
        let docset_root = docset_root.as_ref();
        let provider = DependencyLockProvider::create_from_store(&app_data, docset_root, locale)?;
        Ok(Self::new(provider, docset_root, app_data, options))
    }

    /// Resolves `package` to its directory and, for git packages, its commit.
    ///
    /// # Errors
    ///
    /// - [`RestoreError::DirectoryNotFound`] for a folder that does not exist.
    /// - [`RestoreError::NeedRestore`] for a git package with no pinned commit,
    ///   or whose restored directory is missing.
    /// - [`RestoreError::LockTimeout`] / [`RestoreError::LockCancelled`] when
    ///   the shared lock on the cache root cannot be taken. A
    ///   [`release`](Self::release) that runs while this call waits for the lock
    ///   also ends it with `LockCancelled`, holding nothing.
    pub async fn get_restore_git_path(
        &self,
        package: &PackagePath,
        flags: RestoreGitFlags,
    ) -> Result<ResolvedPath, RestoreError> {
        match package {
            PackagePath::Folder { path } => {
                let full_path = self.docset_root.join(path);
                if full_path.is_dir() {
                    Ok((full_path, None))
                } else {
                    Err(RestoreError::DirectoryNotFound {
                        location: SourceInfo::new(path.display().to_string())
                            .with_file(&self.docset_root),
                    })
                }
            }
            PackagePath::Git { url, branch } => {
                let commit = self
                    .provider
                    .get_git_lock(url, branch)
                    .and_then(|lock| lock.commit.clone())
                    .ok_or_else(|| RestoreError::NeedRestore {
                        package: package.to_string(),
                    })?;

                let cache_root = self.app_data.git_dir(url);
                let target = if flags.contains(RestoreGitFlags::BARE) {
                    cache_root.clone()
                } else {
                    self.app_data.worktree_dir(url)
                };

                if !target.is_dir() {
                    debug!(package = %package, target = %target.display(), "Restored directory missing");
                    return Err(RestoreError::NeedRestore {
                        package: package.to_string(),
                    });
                }

                self.acquire_shared(&cache_root).await?;

                debug!(package = %package, commit = %commit, "Resolved git dependency to {}", target.display());
                Ok((target, Some(commit)))
            }
        }
    }

    /// Like [`get_restore_git_path`](Self::get_restore_git_path), but a
    /// dependency that is not (or no longer) available is `Ok(None)`.
    ///
    /// Only the expected family ([`RestoreError::is_expected`]) becomes `None`;
    /// lock failures and I/O errors still propagate.
    pub async fn try_get_restore_git_path(
        &self,
        package: &PackagePath,
        flags: RestoreGitFlags,
    ) -> Result<Option<ResolvedPath>, RestoreError> {
        match self.get_restore_git_path(package, flags).await {
            Ok(resolved) => Ok(Some(resolved)),
            Err(e) if e.is_expected() => {
                debug!(package = %package, error = %e, "Dependency not available");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn acquire_shared(&self, cache_root: &Path) -> Result<(), RestoreError> {
        // Clone the cell out so no map shard stays locked across the await
        let cell: LockCell = Arc::clone(&self.locks.entry(cache_root.to_path_buf()).or_default());

        let lock = cell
            .get_or_try_init(|| async {
                let lock = InterProcessReaderWriterLock::acquire_reader(
                    &self.app_data.lock_dir(),
                    cache_root,
                    &self.options,
                )
                .await?;
                self.acquisitions.fetch_add(1, Ordering::SeqCst);
                Ok::<_, RestoreError>(Arc::new(lock))
            })
            .await?;

        // `release` dropped this cell while we waited
        let tracked =
            self.locks.get(cache_root).is_some_and(|entry| Arc::ptr_eq(entry.value(), &cell));
        if !tracked {
            if let Err(e) = lock.release() {
                warn!(path = %cache_root.display(), error = %e, "Failed to release cache lock");
            }
            debug!(path = %cache_root.display(), "Map released during lock wait");
            return Err(RestoreError::LockCancelled {
                path: cache_root.to_path_buf(),
            });
        }

        Ok(())
    }

    /// Cache roots this map currently holds a shared lock on, sorted.
    #[must_use]
    pub fn held_locks(&self) -> Vec<PathBuf> {
        let mut held: Vec<PathBuf> = self
            .locks
            .iter()
            .filter(|entry| entry.value().get().is_some_and(|lock| lock.is_held()))
            .map(|entry| entry.key().clone())
            .collect();
        held.sort();
        held
    }

    /// Number of OS-level lock acquisitions this map has performed.
    #[must_use]
    pub fn acquisition_count(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Releases every lock this map acquired.
    ///
    /// Every handle is attempted even if an earlier one fails; failures are
    /// reported together as [`RestoreError::LockRelease`]. Safe to call more
    /// than once, and with nothing acquired. Resolutions still waiting for a
    /// lock fail with [`RestoreError::LockCancelled`].
    pub fn release(&self) -> Result<(), RestoreError> {
        let roots: Vec<PathBuf> = self.locks.iter().map(|entry| entry.key().clone()).collect();

        let mut failures = Vec::new();
        for root in roots {
            let Some((root, cell)) = self.locks.remove(&root) else {
                continue;
            };
            if let Some(lock) = cell.get()
                && let Err(e) = lock.release()
            {
                failures.push((root, e.to_string()));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RestoreError::LockRelease {
                failures,
            })
        }
    }
}

impl Drop for RestoreGitMap {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "Failed to release dependency locks");
        }
    }
}
