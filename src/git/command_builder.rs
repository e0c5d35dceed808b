//! Fluent builder for git subprocesses.
//!
//! Every git invocation goes through [`GitCommand`] so that working directory
//! handling, timeouts, error mapping and tracing are identical everywhere.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::default_git_timeout;
use crate::core::RestoreError;
use crate::utils::platform::get_git_command;

/// Builder for one git invocation.
///
/// ```rust,no_run
/// use docrestore::git::command_builder::GitCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// let commit = GitCommand::rev_parse("FETCH_HEAD")
///     .current_dir("/home/user/.docrestore/git/templates-0a1b2c3d4e5f6a7b")
///     .with_context("templates#main")
///     .execute_stdout()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// Defaults: output captured, 5 minute timeout, process working directory.
/// Interactive prompts are disabled (`GIT_TERMINAL_PROMPT=0`) so a missing
/// credential fails fast instead of hanging until the timeout.
#[derive(Debug, Clone)]
pub struct GitCommand {
    args: Vec<String>,
    /// Passed as `-C <dir>` rather than set on the process
    current_dir: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
    timeout_duration: Option<Duration>,
    /// Prefix for log lines, typically the package being restored
    context: Option<String>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            env_vars: vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())],
            timeout_duration: Some(default_git_timeout()),
            context: None,
        }
    }
}

impl GitCommand {
    /// Creates an empty command with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs git against `dir` (`git -C dir ...`).
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Overrides the timeout (`None` waits forever).
    #[must_use]
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Tags log lines with `context`, to tell concurrent restores apart.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Arguments as git will see them, including `-C <dir>`.
    #[must_use]
    pub fn full_args(&self) -> Vec<String> {
        let mut full_args = Vec::with_capacity(self.args.len() + 2);
        if let Some(dir) = &self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.iter().cloned());
        full_args
    }

    /// Git subcommand name for error messages (`worktree add`, `fetch`, ...).
    fn operation(&self) -> String {
        match self.args.as_slice() {
            [] => "unknown".to_string(),
            [first, second, ..] if first == "worktree" => format!("worktree {second}"),
            [first, ..] => first.clone(),
        }
    }

    fn prefix(&self) -> String {
        self.context.as_ref().map(|ctx| format!("({ctx}) ")).unwrap_or_default()
    }

    /// Runs the command and returns its captured output.
    ///
    /// A non-zero exit status or a timeout becomes
    /// [`RestoreError::GitCommandError`].
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let start = Instant::now();
        let git_command = get_git_command();
        let full_args = self.full_args();
        let prefix = self.prefix();
        let operation = self.operation();

        tracing::debug!(target: "git", "{prefix}Executing command: {git_command} {}", full_args.join(" "));

        let mut cmd = Command::new(git_command);
        cmd.args(&full_args).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        let output_future = cmd.output();
        let output = match self.timeout_duration {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        target: "git",
                        "{prefix}Command timed out after {} seconds: git {}",
                        duration.as_secs(),
                        full_args.join(" ")
                    );
                    return Err(RestoreError::GitCommandError {
                        operation,
                        stderr: format!(
                            "git command timed out after {} seconds: git {}",
                            duration.as_secs(),
                            full_args.join(" ")
                        ),
                    }
                    .into());
                }
            },
            None => output_future.await,
        }
        .with_context(|| format!("Failed to execute git {}", full_args.join(" ")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "git",
                "{prefix}Command failed with exit code {:?}: {}",
                output.status.code(),
                stderr.trim()
            );
            return Err(RestoreError::GitCommandError {
                operation,
                stderr: if stderr.trim().is_empty() { stdout } else { stderr },
            }
            .into());
        }

        if !stderr.trim().is_empty() {
            tracing::trace!(target: "git", "{prefix}{}", stderr.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(target: "git::perf", "{prefix}Git {operation} took {:.2}s", elapsed.as_secs_f64());
        } else if elapsed.as_millis() > 100 {
            tracing::debug!(target: "git::perf", "{prefix}Git {operation} took {}ms", elapsed.as_millis());
        }

        Ok(GitCommandOutput {
            stdout,
            stderr,
        })
    }

    /// Runs the command and returns trimmed stdout.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Runs the command, discarding output.
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }
}

/// Captured output of a finished git command.
#[derive(Debug, Clone)]
pub struct GitCommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error (git writes progress here)
    pub stderr: String,
}

// Convenience builders for the operations a restore performs

impl GitCommand {
    /// `git init --bare`
    #[must_use]
    pub fn init_bare() -> Self {
        Self::new().args(["init", "--bare", "--quiet"])
    }

    /// `git fetch --force [--depth 1] <url> <branch>`
    #[must_use]
    pub fn fetch_branch(url: &str, branch: &str, depth_one: bool) -> Self {
        let mut cmd = Self::new().args(["fetch", "--force", "--no-tags"]);
        if depth_one {
            cmd = cmd.args(["--depth", "1"]);
        }
        cmd.args([url, branch])
    }

    /// `git rev-parse --verify <ref>^{commit}`
    #[must_use]
    pub fn rev_parse(ref_name: &str) -> Self {
        Self::new().args(["rev-parse", "--verify"]).arg(format!("{ref_name}^{{commit}}"))
    }

    /// `git worktree add --force --detach <path> <commit>`
    #[must_use]
    pub fn worktree_add(worktree_path: impl AsRef<Path>, commit: &str) -> Self {
        Self::new()
            .args(["worktree", "add", "--force", "--detach"])
            .arg(worktree_path.as_ref().display().to_string())
            .arg(commit)
    }

    /// `git worktree prune`
    #[must_use]
    pub fn worktree_prune() -> Self {
        Self::new().args(["worktree", "prune"])
    }

    /// `git checkout --force --detach <commit>`
    #[must_use]
    pub fn checkout_detached(commit: &str) -> Self {
        Self::new().args(["checkout", "--force", "--detach", commit])
    }
}
