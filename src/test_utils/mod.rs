//! Test utilities for docrestore
//!
//! Helpers shared by unit tests and the integration suite (enabled through the
//! `test-utils` feature):
//! - [`TestEnvironment`] - an isolated app data root plus docset directory,
//!   with helpers to pin commits and fake restored caches
//! - [`TestGit`] - a small wrapper around the `git` binary for building local
//!   source repositories
//!
//! # Example
//!
//! ```rust,no_run
//! use docrestore::test_utils::TestEnvironment;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let env = TestEnvironment::new()?;
//! env.pin("https://github.com/org/repo", "main", "abc123", "en-us")?;
//! env.materialize_worktree("https://github.com/org/repo")?;
//!
//! let map = env.map("en-us")?;
//! # Ok(())
//! # }
//! ```

pub mod environment;
pub mod git_helper;

pub use environment::TestEnvironment;
pub use git_helper::TestGit;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, tests run
/// without a subscriber.
///
/// ```bash
/// RUST_LOG=docrestore=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
