//! docrestore - dependency restore for documentation builds
//!
//! A docset declares dependencies on local folders and on git repositories
//! pinned to a branch. docrestore restores the git dependencies into a cache
//! shared by every build on the machine, pins the exact commit each one was
//! restored to, and at build time resolves every dependency to a directory on
//! disk and a commit.
//!
//! Many builds and restores run concurrently against the one cache, so access
//! is coordinated with cross-process reader/writer locks: a build holds a
//! shared lock on each repository cache it uses for the whole build, and a
//! restore takes the exclusive lock while it rewrites that cache.
//!
//! # Core Modules
//!
//! - [`package`] - dependency descriptions and flags
//! - [`lockfile`] - the per-docset, per-locale record of pinned commits
//! - [`cache`] - cache layout under the app data root, and [`cache::lock`] for
//!   the inter-process reader/writer lock
//! - [`restore`] - [`RestoreGitMap`](restore::RestoreGitMap) for resolution,
//!   [`restore_packages`](restore::restore_packages) for restore
//! - [`git`] - the system-git fetcher used by restore
//!
//! ## Supporting Modules
//! - [`cli`] - the `docrestore` command line
//! - [`config`] - app data root and `config.toml`
//! - [`core`] - error types and diagnostics
//! - [`utils`] - atomic writes, hashing and platform helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use docrestore::cache::AppData;
//! use docrestore::cache::lock::LockOptions;
//! use docrestore::package::{PackagePath, RestoreGitFlags};
//! use docrestore::restore::RestoreGitMap;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let map = RestoreGitMap::create(AppData::new()?, "docs", "en-us", LockOptions::default())?;
//!
//! let templates: PackagePath = "https://github.com/org/templates#main".parse()?;
//! match map.try_get_restore_git_path(&templates, RestoreGitFlags::NONE).await? {
//!     Some((dir, commit)) => println!("{} at {:?}", dir.display(), commit),
//!     None => println!("run `docrestore restore` first"),
//! }
//!
//! // Release every shared lock the build took
//! map.release()?;
//! # Ok(())
//! # }
//! ```

// Core functionality
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;

// Dependency model and restore
pub mod git;
pub mod lockfile;
pub mod package;
pub mod restore;

// Supporting modules
pub mod utils;

// Test utilities (only compiled in test mode or with test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
