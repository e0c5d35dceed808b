//! Restoring git dependencies with the system `git` binary.
//!
//! Like Cargo's `git-fetch-with-cli`, docrestore shells out to the installed
//! git instead of embedding a git library, so SSH agents, credential helpers
//! and user configuration all work unchanged.
//!
//! Each repository URL gets one cache root under `{app_data}/git/`, laid out as
//! a bare repository with a single linked working tree in slot `1`:
//!
//! ```text
//! git/templates-0a1b2c3d4e5f6a7b/   # git init --bare
//! ├── HEAD, objects/, refs/, ...
//! └── 1/                            # git worktree add --detach 1 <commit>
//! ```
//!
//! A restore fetches the branch straight from the URL (no remotes are
//! configured), resolves `FETCH_HEAD` to a commit and checks that commit out
//! in the working tree.

pub mod command_builder;

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::debug;

use crate::constants::default_git_timeout;
use crate::package::PackageFetchOptions;
use crate::restore::{FetchRequest, GitFetcher};
use command_builder::GitCommand;

/// [`GitFetcher`] that runs the system git.
#[derive(Debug, Clone)]
pub struct GitCommandFetcher {
    timeout: Duration,
}

impl Default for GitCommandFetcher {
    fn default() -> Self {
        Self::new(default_git_timeout())
    }
}

impl GitCommandFetcher {
    /// Fetcher whose git subprocesses each time out after `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
        }
    }

    fn command(&self, command: GitCommand, context: &str) -> GitCommand {
        command.with_timeout(Some(self.timeout)).with_context(context)
    }
}

impl GitFetcher for GitCommandFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String> {
        let context = format!("{}#{}", strip_auth_from_url(&request.url), request.branch);
        let cache_root = &request.cache_root;

        if !cache_root.join("HEAD").exists() {
            debug!("({context}) Initializing cache root {}", cache_root.display());
            tokio::fs::create_dir_all(cache_root).await.with_context(|| {
                format!("Failed to create cache directory: {}", cache_root.display())
            })?;
            self.command(GitCommand::init_bare(), &context)
                .current_dir(cache_root)
                .execute_success()
                .await?;
        }

        let depth_one = request.options.contains(PackageFetchOptions::DEPTH_ONE);
        self.command(GitCommand::fetch_branch(&request.url, &request.branch, depth_one), &context)
            .current_dir(cache_root)
            .execute_success()
            .await?;

        let commit = self
            .command(GitCommand::rev_parse("FETCH_HEAD"), &context)
            .current_dir(cache_root)
            .execute_stdout()
            .await?;

        if request.worktree.join(".git").exists() {
            self.command(GitCommand::checkout_detached(&commit), &context)
                .current_dir(&request.worktree)
                .execute_success()
                .await?;
        } else {
            if request.worktree.exists() {
                tokio::fs::remove_dir_all(&request.worktree).await.with_context(|| {
                    format!("Failed to remove stale working tree: {}", request.worktree.display())
                })?;
            }
            self.command(GitCommand::worktree_prune(), &context)
                .current_dir(cache_root)
                .execute_success()
                .await?;
            // git resolves the path relative to `-C`, so pass it absolute
            let worktree = std::path::absolute(&request.worktree)?;
            self.command(GitCommand::worktree_add(&worktree, &commit), &context)
                .current_dir(cache_root)
                .execute_success()
                .await?;
        }

        debug!("({context}) Checked out {commit} into {}", request.worktree.display());
        Ok(commit)
    }
}

/// Whether a working `git` is on the `PATH`.
#[must_use]
pub fn is_git_installed() -> bool {
    std::process::Command::new(crate::utils::platform::get_git_command())
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Removes `user:token@` credentials from an HTTP(S) URL, for logging.
#[must_use]
pub fn strip_auth_from_url(url: &str) -> String {
    let Some(protocol_end) = ["https://", "http://"]
        .iter()
        .find(|scheme| url.starts_with(*scheme))
        .map(|scheme| scheme.len())
    else {
        return url.to_string();
    };

    let rest = &url[protocol_end..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}{}", &url[..protocol_end], &rest[at + 1..]),
        None => url.to_string(),
    }
}
