//! Configuration management for docrestore
//!
//! Two concerns live here:
//!
//! 1. **App data root** - the single, process-wide directory every docset on the
//!    machine shares. It holds the git cache, the inter-process lock files and the
//!    dependency lock store. See [`get_app_data_dir`].
//! 2. **Global configuration** (`{app_data}/config.toml`) - user-wide tunables
//!    such as lock and git timeouts. See [`RestoreConfig`].
//!
//! # Locations
//!
//! - **Unix/macOS**: `~/.docrestore/`
//! - **Windows**: `%LOCALAPPDATA%\docrestore\`
//! - **Override**: `DOCRESTORE_APPDATA_PATH` for the root,
//!   `DOCRESTORE_CONFIG_PATH` for the config file
//!
//! # Example `config.toml`
//!
//! ```toml
//! lock_timeout_secs = 300
//! git_timeout_secs = 600
//! stale_lock_ttl_secs = 86400
//! ```

pub mod global;

pub use global::RestoreConfig;

use crate::constants::APPDATA_PATH_ENV;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Returns the process-wide app data root, creating it if needed.
///
/// `DOCRESTORE_APPDATA_PATH` takes precedence (essential for tests and CI);
/// otherwise the platform default is used.
pub fn get_app_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(APPDATA_PATH_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }

    let dir = if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
            .join("docrestore")
    } else {
        dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".docrestore")
    };

    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create app data directory: {}", dir.display()))?;
    }

    Ok(dir)
}
