//! Global configuration file (`{app_data}/config.toml`).
//!
//! Every field is optional in the file; a missing file yields
//! [`RestoreConfig::default`]. Command-line flags override whatever is loaded
//! here.

use crate::constants::{CONFIG_PATH_ENV, default_git_timeout, default_lock_timeout};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

fn default_lock_timeout_secs() -> u64 {
    default_lock_timeout().as_secs()
}

fn default_git_timeout_secs() -> u64 {
    default_git_timeout().as_secs()
}

const fn default_stale_lock_ttl_secs() -> u64 {
    24 * 60 * 60
}

/// User-wide restore settings.
///
/// ```rust,no_run
/// use docrestore::config::RestoreConfig;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = RestoreConfig::load_for(Path::new("/home/user/.docrestore")).await?;
/// println!("waiting up to {:?} for cache locks", config.lock_timeout());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RestoreConfig {
    /// Seconds to wait for an inter-process cache lock before giving up.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// Seconds a single git subprocess may run.
    #[serde(default = "default_git_timeout_secs")]
    pub git_timeout_secs: u64,

    /// Age after which an unlocked lock file is considered stale by `locks clean`.
    #[serde(default = "default_stale_lock_ttl_secs")]
    pub stale_lock_ttl_secs: u64,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout_secs: default_lock_timeout_secs(),
            git_timeout_secs: default_git_timeout_secs(),
            stale_lock_ttl_secs: default_stale_lock_ttl_secs(),
        }
    }
}

impl RestoreConfig {
    /// Loads the config belonging to the app data root at `app_data_root`.
    ///
    /// `DOCRESTORE_CONFIG_PATH` still wins when set. A missing file yields
    /// defaults.
    pub async fn load_for(app_data_root: &Path) -> Result<Self> {
        let path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => PathBuf::from(path),
            Err(_) => app_data_root.join("config.toml"),
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Loads the config from an explicit path.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Lock acquisition timeout.
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    /// Git subprocess timeout.
    #[must_use]
    pub const fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }

    /// Stale lock file age.
    #[must_use]
    pub const fn stale_lock_ttl(&self) -> Duration {
        Duration::from_secs(self.stale_lock_ttl_secs)
    }
}
