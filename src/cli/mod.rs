//! Command-line interface for docrestore.
//!
//! # Commands
//!
//! - `restore` - fetch a docset's git dependencies into the shared cache and
//!   pin the fetched commits
//! - `resolve` - print where each dependency resolves to, as a build would see it
//! - `locks clean` - remove stale lock files from the cache
//!
//! # Examples
//!
//! ```bash
//! docrestore restore ./docs --locale en-us https://github.com/org/templates#main
//! docrestore resolve ./docs --format json https://github.com/org/templates#main assets
//! docrestore -v locks clean --ttl-secs 3600
//! ```
//!
//! Timeouts default to the values in `{app_data}/config.toml` (see
//! [`RestoreConfig`]); flags override them.

mod locks;
mod resolve;
mod restore;

pub use locks::LocksCommand;
pub use resolve::{OutputFormat, ResolveCommand};
pub use restore::RestoreCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::cache::AppData;
use crate::config::RestoreConfig;

/// Dependency restore for documentation builds.
#[derive(Parser, Debug)]
#[command(
    name = "docrestore",
    about = "Restore and resolve documentation dependencies against a shared cache",
    version,
    long_about = "docrestore fetches the git dependencies of a docset into a cache shared by every build on the machine, pins the fetched commits, and resolves dependencies to cached paths under cross-process reader/writer locks."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (same as `RUST_LOG=docrestore=debug`)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Cache root to use instead of `DOCRESTORE_APPDATA_PATH` or the default
    #[arg(long, global = true, value_name = "DIR")]
    app_data: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch git dependencies and record their commits
    Restore(RestoreCommand),

    /// Resolve dependencies to cached paths and commits
    Resolve(ResolveCommand),

    /// Manage inter-process lock files
    Locks(LocksCommand),
}

/// Shared state handed to every subcommand.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// The cache root
    pub app_data: AppData,
    /// Settings loaded from the cache root's config file
    pub config: RestoreConfig,
}

impl Cli {
    /// Installs the tracing subscriber for this invocation.
    ///
    /// `RUST_LOG` wins when set; otherwise `--verbose` and `--quiet` pick the
    /// level. Logs go to stderr so `resolve --format json` output stays clean.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if self.verbose {
            EnvFilter::new("docrestore=debug,git=debug")
        } else if self.quiet {
            EnvFilter::new("error")
        } else {
            EnvFilter::new("docrestore=warn")
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(self.verbose)
            .without_time()
            .try_init();
    }

    /// Runs the selected subcommand.
    pub async fn execute(self) -> Result<()> {
        let app_data = match &self.app_data {
            Some(root) => AppData::with_root(root),
            None => AppData::new()?,
        };
        let config = RestoreConfig::load_for(app_data.root()).await?;
        let context = CommandContext {
            app_data,
            config,
        };

        match self.command {
            Commands::Restore(cmd) => cmd.execute(&context, self.quiet).await,
            Commands::Resolve(cmd) => cmd.execute(&context).await,
            Commands::Locks(cmd) => cmd.execute(&context, self.quiet).await,
        }
    }
}
