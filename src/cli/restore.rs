//! `docrestore restore`

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::CommandContext;
use crate::cache::lock::LockOptions;
use crate::git::GitCommandFetcher;
use crate::package::{PackageFetchOptions, PackagePath};
use crate::restore::restore_packages;

/// Fetch git dependencies of a docset and pin their commits.
#[derive(Args, Debug)]
pub struct RestoreCommand {
    /// Docset root directory
    docset: PathBuf,

    /// Dependencies to restore (`url#branch` or a folder path)
    #[arg(value_name = "PACKAGE")]
    packages: Vec<PackagePath>,

    /// Dependency whose restore may fail without failing the command
    #[arg(long, value_name = "PACKAGE")]
    optional: Vec<PackagePath>,

    /// Locale the dependency lock is recorded for
    #[arg(long, default_value = "")]
    locale: String,

    /// Fetch only the branch head (`git fetch --depth 1`)
    #[arg(long)]
    depth_one: bool,

    /// Seconds to wait for a cache lock held by another process
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Seconds a single git command may run
    #[arg(long, value_name = "SECS")]
    git_timeout_secs: Option<u64>,
}

impl RestoreCommand {
    fn declared(&self) -> Vec<(PackagePath, PackageFetchOptions)> {
        let base = if self.depth_one {
            PackageFetchOptions::DEPTH_ONE
        } else {
            PackageFetchOptions::NONE
        };

        self.packages
            .iter()
            .map(|package| (package.clone(), base))
            .chain(
                self.optional
                    .iter()
                    .map(|package| (package.clone(), base | PackageFetchOptions::IGNORE_ERROR)),
            )
            .collect()
    }

    pub(super) async fn execute(self, context: &CommandContext, quiet: bool) -> Result<()> {
        let packages = self.declared();
        if packages.is_empty() {
            if !quiet {
                println!("Nothing to restore");
            }
            return Ok(());
        }

        let lock_timeout =
            self.timeout_secs.map_or_else(|| context.config.lock_timeout(), Duration::from_secs);
        let git_timeout =
            self.git_timeout_secs.map_or_else(|| context.config.git_timeout(), Duration::from_secs);

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        let lock_options = LockOptions::new(lock_timeout).with_cancellation(cancel);
        let fetcher = GitCommandFetcher::new(git_timeout);
        let result = restore_packages(
            &context.app_data,
            &self.docset,
            &self.locale,
            &packages,
            &fetcher,
            &lock_options,
        )
        .await;
        interrupt.abort();

        let summary = result?;
        if !quiet {
            for restored in &summary.restored {
                let short: String = restored.commit.chars().take(12).collect();
                println!("{} {} @ {}", "Restored".green().bold(), restored.package, short);
            }
            for skipped in &summary.skipped {
                println!("{} {} ({})", "Skipped".yellow().bold(), skipped.package, skipped.reason);
            }
        }
        Ok(())
    }
}
