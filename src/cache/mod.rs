//! The process-wide restore cache.
//!
//! Every docset built on a machine shares one cache root, so two docsets that
//! depend on the same repository share a single clone of it:
//!
//! ```text
//! {app_data}/
//! ├── git/
//! │   └── {name}-{hash}/          # cache root for one repository URL
//! │       └── 1/                  # the working tree
//! ├── locks/
//! │   └── {sha256}.lock           # see [`lock`]
//! └── dependency-lock/
//!     └── {docset-hash}/{locale}.toml
//! ```
//!
//! The cache root name depends only on the URL, never on the branch. The
//! readable `{name}` part helps a human browsing the cache; uniqueness comes
//! from `{hash}`, the first 8 bytes of the URL's SHA-256.

pub mod lock;

use crate::config::get_app_data_dir;
use crate::constants::{
    DEFAULT_LOCALE, DEPENDENCY_LOCK_DIR_NAME, GIT_DIR_NAME, LOCKS_DIR_NAME, WORKTREE_SLOT,
};
use crate::utils::fs::safe_canonicalize;
use crate::utils::hash::short_hash;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAX_NAME_LEN: usize = 40;

/// Handle on the cache root.
///
/// Cheap to clone; holds nothing but the root path. All directory naming is
/// pure, so two processes given the same root agree on every path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppData {
    root: PathBuf,
}

impl AppData {
    /// The user's cache root (`DOCRESTORE_APPDATA_PATH`, else the platform default).
    pub fn new() -> Result<Self> {
        Ok(Self {
            root: get_app_data_dir()?,
        })
    }

    /// A cache rooted at an explicit directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// The cache root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parent of all git cache roots.
    #[must_use]
    pub fn git_root(&self) -> PathBuf {
        self.root.join(GIT_DIR_NAME)
    }

    /// Cache root for the repository at `url`.
    ///
    /// ```rust
    /// use docrestore::cache::AppData;
    ///
    /// let app_data = AppData::with_root("/cache");
    /// let dir = app_data.git_dir("https://github.com/org/templates.git");
    /// let name = dir.file_name().unwrap().to_str().unwrap();
    /// assert!(name.starts_with("templates-"));
    /// assert_eq!(dir, app_data.git_dir("https://github.com/org/templates.git"));
    /// ```
    #[must_use]
    pub fn git_dir(&self, url: &str) -> PathBuf {
        self.git_root().join(format!("{}-{}", repository_name(url), short_hash(url, 8)))
    }

    /// The working-tree slot inside the cache root for `url`.
    #[must_use]
    pub fn worktree_dir(&self, url: &str) -> PathBuf {
        self.git_dir(url).join(WORKTREE_SLOT)
    }

    /// Directory holding inter-process lock files.
    #[must_use]
    pub fn lock_dir(&self) -> PathBuf {
        self.root.join(LOCKS_DIR_NAME)
    }

    /// Parent of all dependency lock documents.
    #[must_use]
    pub fn dependency_lock_root(&self) -> PathBuf {
        self.root.join(DEPENDENCY_LOCK_DIR_NAME)
    }

    /// Dependency lock document for `docset_root` and `locale`.
    ///
    /// The docset is identified by its canonical path, so `docs`, `docs/` and
    /// `x/../docs` share one document. Locales compare case-insensitively, and
    /// an empty locale is stored as `default`.
    #[must_use]
    pub fn dependency_lock_file(&self, docset_root: &Path, locale: &str) -> PathBuf {
        let docset = safe_canonicalize(docset_root);
        self.dependency_lock_root()
            .join(short_hash(&docset.to_string_lossy(), 8))
            .join(format!("{}.toml", normalize_locale(locale)))
    }

    /// Removes lock files older than `ttl` that no process holds.
    pub async fn cleanup_stale_locks(&self, ttl: Duration) -> Result<usize> {
        lock::cleanup_stale_locks(&self.lock_dir(), ttl).await
    }
}

/// Lowercased, trimmed locale; `default` when empty.
#[must_use]
pub fn normalize_locale(locale: &str) -> String {
    let locale = locale.trim();
    if locale.is_empty() {
        DEFAULT_LOCALE.to_string()
    } else {
        locale.to_lowercase()
    }
}

/// Filesystem-safe name for the last path segment of `url`.
fn repository_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let segment = trimmed.rsplit(['/', ':', '\\']).next().unwrap_or(trimmed);
    let segment = segment.strip_suffix(".git").unwrap_or(segment);

    let name: String = segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .take(MAX_NAME_LEN)
        .collect();

    if name.is_empty() || name.chars().all(|c| c == '.') {
        "repo".to_string()
    } else {
        name
    }
}
