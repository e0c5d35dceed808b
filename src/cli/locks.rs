//! `docrestore locks`

use anyhow::Result;
use clap::{Args, Subcommand};
use std::time::Duration;

use super::CommandContext;

/// Manage inter-process lock files.
#[derive(Args, Debug)]
pub struct LocksCommand {
    #[command(subcommand)]
    action: LocksAction,
}

#[derive(Subcommand, Debug)]
enum LocksAction {
    /// Remove lock files that are old and not held by any process
    Clean {
        /// Minimum age in seconds (defaults to `stale_lock_ttl_secs` from config)
        #[arg(long, value_name = "SECS")]
        ttl_secs: Option<u64>,
    },
}

impl LocksCommand {
    pub(super) async fn execute(self, context: &CommandContext, quiet: bool) -> Result<()> {
        match self.action {
            LocksAction::Clean { ttl_secs } => {
                let ttl = ttl_secs.map_or_else(|| context.config.stale_lock_ttl(), Duration::from_secs);
                let removed = context.app_data.cleanup_stale_locks(ttl).await?;
                if !quiet {
                    println!("Removed {removed} stale lock file(s)");
                }
                Ok(())
            }
        }
    }
}
