//! `docrestore resolve`

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use super::CommandContext;
use crate::cache::lock::LockOptions;
use crate::package::{PackagePath, RestoreGitFlags};
use crate::restore::RestoreGitMap;

/// Output format for `resolve`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One line per dependency
    #[default]
    Text,
    /// A JSON array
    Json,
}

/// Resolve dependencies the way a build would.
#[derive(Args, Debug)]
pub struct ResolveCommand {
    /// Docset root directory
    docset: PathBuf,

    /// Dependencies to resolve (`url#branch` or a folder path)
    #[arg(value_name = "PACKAGE", required = true)]
    packages: Vec<PackagePath>,

    /// Locale whose dependency lock is used
    #[arg(long, default_value = "")]
    locale: String,

    /// Resolve git dependencies to the repository storage instead of the working tree
    #[arg(long)]
    bare: bool,

    /// Report unavailable dependencies instead of failing on the first one
    #[arg(long)]
    allow_missing: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Seconds to wait for a cache lock held by a restore
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ResolvedEntry {
    package: String,
    path: Option<PathBuf>,
    commit: Option<String>,
}

impl ResolveCommand {
    pub(super) async fn execute(self, context: &CommandContext) -> Result<()> {
        let timeout =
            self.timeout_secs.map_or_else(|| context.config.lock_timeout(), Duration::from_secs);
        let flags = if self.bare {
            RestoreGitFlags::BARE
        } else {
            RestoreGitFlags::NONE
        };

        let map = RestoreGitMap::create(
            context.app_data.clone(),
            &self.docset,
            &self.locale,
            LockOptions::new(timeout),
        )?;

        let mut entries = Vec::with_capacity(self.packages.len());
        for package in &self.packages {
            let resolved = if self.allow_missing {
                map.try_get_restore_git_path(package, flags).await?
            } else {
                Some(map.get_restore_git_path(package, flags).await?)
            };
            let (path, commit) = resolved.map_or((None, None), |(path, commit)| (Some(path), commit));
            entries.push(ResolvedEntry {
                package: package.to_string(),
                path,
                commit,
            });
        }

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            OutputFormat::Text => {
                for entry in &entries {
                    match (&entry.path, &entry.commit) {
                        (Some(path), Some(commit)) => {
                            println!("{} -> {} @ {}", entry.package, path.display(), commit);
                        }
                        (Some(path), None) => println!("{} -> {}", entry.package, path.display()),
                        (None, _) => println!("{} -> {}", entry.package, "not restored".red()),
                    }
                }
            }
        }

        map.release()?;
        Ok(())
    }
}
