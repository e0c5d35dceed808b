//! Cross-process reader/writer locks on cache directories.
//!
//! A build that reads a restored dependency takes a *shared* lock on the
//! dependency's cache root; a restore that fetches into it takes an
//! *exclusive* one. Any number of builds can read the same cache at once, and a
//! restore waits until they are done (and vice versa).
//!
//! Locks are OS file locks (`flock` on Unix, `LockFileEx` on Windows) on a lock
//! file named after the protected path:
//!
//! ```text
//! {app_data}/locks/{sha256(canonical path)}.lock
//! ```
//!
//! The OS drops the lock when the holding process dies, so a crashed build
//! never wedges the cache. Lock files themselves are left in place after
//! release; [`cleanup_stale_locks`] removes old unlocked ones.
//!
//! # Async Safety
//!
//! File opens and lock attempts run in `spawn_blocking`. Acquisition never
//! blocks on the OS call: it retries `try_lock_*` with exponential backoff until
//! the lock is granted, the timeout elapses, or the caller cancels.

use crate::constants::{MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS, default_lock_timeout};
use crate::core::RestoreError;
use crate::utils::fs::safe_canonicalize;
use crate::utils::hash::sha256_hex;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};
use tokio_retry::strategy::ExponentialBackoff;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How long to wait for a lock, and how to abandon the wait.
#[derive(Debug, Clone)]
pub struct LockOptions {
    /// Upper bound on the total wait.
    pub timeout: Duration,
    /// Cancelling this token aborts a pending wait with [`RestoreError::LockCancelled`].
    pub cancel: CancellationToken,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: default_lock_timeout(),
            cancel: CancellationToken::new(),
        }
    }
}

impl LockOptions {
    /// Options with the given timeout and a token nobody cancels.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Ties the wait to an existing cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Shared (reader) or exclusive (writer) access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Many holders, excluded by a writer.
    Shared,
    /// Single holder, excludes readers and other writers.
    Exclusive,
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// A held inter-process lock on a path.
///
/// Released by [`release`](Self::release) or, failing that, on drop.
///
/// ```rust,no_run
/// use docrestore::cache::lock::{InterProcessReaderWriterLock, LockOptions};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), docrestore::core::RestoreError> {
/// let locks = Path::new("/home/user/.docrestore/locks");
/// let cache_root = Path::new("/home/user/.docrestore/git/templates-0a1b2c3d4e5f6a7b");
///
/// let reader = InterProcessReaderWriterLock::acquire_reader(locks, cache_root, &LockOptions::default()).await?;
/// // ... read files under cache_root ...
/// reader.release()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct InterProcessReaderWriterLock {
    /// Open handle holding the lock; `None` once released
    file: Mutex<Option<Arc<File>>>,
    path: PathBuf,
    lock_path: PathBuf,
    mode: LockMode,
    #[cfg(test)]
    fail_next_release: std::sync::atomic::AtomicBool,
}

impl InterProcessReaderWriterLock {
    /// Acquires a shared lock on `path`.
    pub async fn acquire_reader(
        lock_dir: &Path,
        path: &Path,
        options: &LockOptions,
    ) -> Result<Self, RestoreError> {
        Self::acquire(lock_dir, path, LockMode::Shared, options).await
    }

    /// Acquires an exclusive lock on `path`.
    pub async fn acquire_writer(
        lock_dir: &Path,
        path: &Path,
        options: &LockOptions,
    ) -> Result<Self, RestoreError> {
        Self::acquire(lock_dir, path, LockMode::Exclusive, options).await
    }

    /// Acquires a lock on `path` in the given mode.
    ///
    /// # Errors
    ///
    /// - [`RestoreError::LockTimeout`] when `options.timeout` elapses first. A
    ///   zero timeout makes exactly one attempt.
    /// - [`RestoreError::LockCancelled`] when `options.cancel` fires first.
    /// - [`RestoreError::IoError`] when the lock directory or file cannot be
    ///   created, or the OS rejects the lock call outright.
    ///
    /// In every error case the opened file is dropped and nothing stays locked.
    pub async fn acquire(
        lock_dir: &Path,
        path: &Path,
        mode: LockMode,
        options: &LockOptions,
    ) -> Result<Self, RestoreError> {
        let lock_path = lock_file_path(lock_dir, path);
        debug!(path = %path.display(), %mode, "Waiting for cache lock");

        if options.cancel.is_cancelled() {
            return Err(RestoreError::LockCancelled {
                path: path.to_path_buf(),
            });
        }

        tokio::fs::create_dir_all(lock_dir).await?;

        let mut file = open_lock_file(&lock_path).await?;
        let start = Instant::now();

        // 10ms, 100ms, then capped at 500ms
        let backoff = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            let attempt = Arc::clone(&file);
            let attempt_path = lock_path.clone();
            let (locked, linked) = tokio::task::spawn_blocking(move || {
                try_lock(&attempt, mode).map(|locked| (locked, is_linked(&attempt, &attempt_path)))
            })
            .await
            .map_err(|e| RestoreError::IoError(std::io::Error::other(e)))??;

            if locked && linked {
                debug!(
                    path = %path.display(),
                    %mode,
                    wait_ms = start.elapsed().as_millis(),
                    "Cache lock acquired"
                );
                return Ok(Self {
                    file: Mutex::new(Some(file)),
                    path: path.to_path_buf(),
                    lock_path,
                    mode,
                    #[cfg(test)]
                    fail_next_release: std::sync::atomic::AtomicBool::new(false),
                });
            }

            // A cleanup unlinked the file after we opened it. Any lock we got is on
            // an orphaned inode and protects nothing; dropping the handle drops it.
            if !linked {
                file = open_lock_file(&lock_path).await?;
            }

            let remaining = options.timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                debug!(path = %path.display(), %mode, "Timed out waiting for cache lock");
                return Err(RestoreError::LockTimeout {
                    path: path.to_path_buf(),
                    timeout: options.timeout,
                });
            }

            tokio::select! {
                () = options.cancel.cancelled() => {
                    debug!(path = %path.display(), %mode, "Cache lock wait cancelled");
                    return Err(RestoreError::LockCancelled {
                        path: path.to_path_buf(),
                    });
                }
                () = tokio::time::sleep(delay.min(remaining)) => {}
            }
        }

        Err(RestoreError::LockTimeout {
            path: path.to_path_buf(),
            timeout: options.timeout,
        })
    }

    /// Releases the lock. Calling it again is a no-op.
    ///
    /// The handle is closed even when the unlock call fails, and closing it
    /// drops the OS lock, so an error here never leaves the path locked.
    pub fn release(&self) -> std::io::Result<()> {
        #[cfg(test)]
        if self.fail_next_release.swap(false, std::sync::atomic::Ordering::SeqCst) {
            return Err(std::io::Error::other("injected release failure"));
        }

        let file = match self.file.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        let Some(file) = file else {
            return Ok(());
        };

        let result = fs4::fs_std::FileExt::unlock(&*file);
        drop(file);
        debug!(path = %self.path.display(), mode = %self.mode, "Cache lock released");
        result
    }

    /// Whether the lock is still held.
    #[must_use]
    pub fn is_held(&self) -> bool {
        match self.file.lock() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }

    /// The protected path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The backing lock file.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Shared or exclusive.
    #[must_use]
    pub const fn mode(&self) -> LockMode {
        self.mode
    }

    /// Makes the next [`release`](Self::release) fail without unlocking.
    #[cfg(test)]
    pub(crate) fn inject_release_failure(&self) {
        self.fail_next_release.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Drop for InterProcessReaderWriterLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(path = %self.path.display(), error = %e, "Failed to release cache lock");
        }
    }
}

/// Lock file used for `path` under `lock_dir`.
///
/// The path is canonicalized first (symlinks and `..` resolved, trailing
/// separators dropped) so every spelling of one directory shares a lock file,
/// even before the directory exists.
#[must_use]
pub fn lock_file_path(lock_dir: &Path, path: &Path) -> PathBuf {
    let mut key = safe_canonicalize(path).to_string_lossy().into_owned();
    if cfg!(windows) {
        key = key.to_lowercase();
    }
    lock_dir.join(format!("{}.lock", sha256_hex(&key)))
}

async fn open_lock_file(lock_path: &Path) -> Result<Arc<File>, RestoreError> {
    let open_path = lock_path.to_path_buf();
    let file = tokio::task::spawn_blocking(move || {
        OpenOptions::new().create(true).read(true).write(true).truncate(false).open(&open_path)
    })
    .await
    .map_err(|e| RestoreError::IoError(std::io::Error::other(e)))??;
    Ok(Arc::new(file))
}

fn try_lock(file: &File, mode: LockMode) -> std::io::Result<bool> {
    let result = match mode {
        LockMode::Shared => fs4::fs_std::FileExt::try_lock_shared(file),
        LockMode::Exclusive => fs4::fs_std::FileExt::try_lock_exclusive(file),
    };
    match result {
        Ok(locked) => Ok(locked),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn is_linked(file: &File, lock_path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), std::fs::metadata(lock_path)) {
        (Ok(held), Ok(current)) => held.dev() == current.dev() && held.ino() == current.ino(),
        _ => false,
    }
}

// Open files cannot be deleted on Windows
#[cfg(not(unix))]
fn is_linked(_file: &File, _lock_path: &Path) -> bool {
    true
}

/// Removes lock files in `lock_dir` older than `ttl` that nobody holds.
///
/// Each candidate is locked exclusively (without waiting) before removal, so
/// a lock in use by a running build or restore is never touched. Returns the
/// number of files removed.
pub async fn cleanup_stale_locks(lock_dir: &Path, ttl: Duration) -> anyhow::Result<usize> {
    use anyhow::Context;

    if !lock_dir.exists() {
        return Ok(0);
    }

    let mut removed_count = 0;
    let now = SystemTime::now();

    let mut entries = tokio::fs::read_dir(lock_dir)
        .await
        .with_context(|| format!("Failed to read locks directory: {}", lock_dir.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        if path.extension().and_then(|s| s.to_str()) != Some("lock") {
            continue;
        }

        let Ok(metadata) = tokio::fs::metadata(&path).await else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };

        if let Ok(age) = now.duration_since(modified)
            && age >= ttl
        {
            let candidate = path.clone();
            let removed = tokio::task::spawn_blocking(move || remove_if_unlocked(&candidate))
                .await
                .context("Lock cleanup task panicked")?;
            if removed {
                debug!(lock_file = %path.display(), "Removed stale lock file");
                removed_count += 1;
            }
        }
    }

    Ok(removed_count)
}

fn remove_if_unlocked(path: &Path) -> bool {
    let Ok(file) = OpenOptions::new().read(true).write(true).open(path) else {
        return false;
    };
    if !matches!(try_lock(&file, LockMode::Exclusive), Ok(true)) {
        return false;
    }
    let removed = std::fs::remove_file(path).is_ok();
    let _ = fs4::fs_std::FileExt::unlock(&file);
    removed
}
