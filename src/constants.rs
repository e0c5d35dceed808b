//! Global constants used throughout the docrestore codebase.
//!
//! Timeouts, backoff parameters and on-disk names that more than one module
//! depends on live here so the cache layout stays discoverable in one place.

use std::time::Duration;

/// Default timeout for inter-process lock acquisition (120 seconds).
///
/// A restore holding the writer lock may be in the middle of a full clone of a
/// large repository, so readers wait long enough to cover a typical fetch.
pub fn default_lock_timeout() -> Duration {
    Duration::from_secs(120)
}

/// Default timeout for a single git subprocess (5 minutes).
pub fn default_git_timeout() -> Duration {
    Duration::from_secs(300)
}

/// Maximum backoff delay between lock attempts (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Starting delay for exponential backoff between lock attempts (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Branch used when a git package reference carries no `#branch` fragment.
pub const DEFAULT_BRANCH: &str = "master";

/// Name of the single working-tree slot under a git cache root.
pub const WORKTREE_SLOT: &str = "1";

/// Subdirectory of the app data root holding git cache roots.
pub const GIT_DIR_NAME: &str = "git";

/// Subdirectory of the app data root holding inter-process lock files.
pub const LOCKS_DIR_NAME: &str = "locks";

/// Subdirectory of the app data root holding dependency lock documents.
pub const DEPENDENCY_LOCK_DIR_NAME: &str = "dependency-lock";

/// Locale directory name used when the caller passes an empty locale.
pub const DEFAULT_LOCALE: &str = "default";

/// Current dependency lock document format version.
pub const DEPENDENCY_LOCK_VERSION: u32 = 1;

/// Environment variable overriding the app data root.
pub const APPDATA_PATH_ENV: &str = "DOCRESTORE_APPDATA_PATH";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "DOCRESTORE_CONFIG_PATH";
