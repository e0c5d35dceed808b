//! Git test helper utilities
//!
//! Builds small local repositories that restore tests fetch from over
//! `file://` URLs, so no test touches the network.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git command wrapper for a test repository.
pub struct TestGit {
    repo_path: PathBuf,
}

impl TestGit {
    fn run_git_command(&self, args: &[&str], action: &str) -> Result<std::process::Output> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .with_context(|| action.to_string())?;

        if !output.status.success() {
            bail!("{} failed: {}", action, String::from_utf8_lossy(&output.stderr));
        }

        Ok(output)
    }

    /// Wraps an existing directory.
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    /// Creates a repository at `path` with one commit on `branch`.
    ///
    /// Each entry of `files` is written (relative path, content) before the
    /// commit.
    pub fn create_repo(path: impl Into<PathBuf>, branch: &str, files: &[(&str, &str)]) -> Result<Self> {
        let git = Self::new(path);
        fs::create_dir_all(&git.repo_path)?;
        git.run_git_command(&["init", "--quiet"], "Failed to initialize git repository")?;
        git.config_user()?;
        git.run_git_command(
            &["checkout", "--quiet", "-b", branch],
            &format!("Failed to create branch: {branch}"),
        )?;
        git.commit_files(files, "Initial commit")?;
        Ok(git)
    }

    /// Configure git user for tests
    pub fn config_user(&self) -> Result<()> {
        self.run_git_command(
            &["config", "user.email", "test@docrestore.example"],
            "Failed to configure git user email",
        )?;
        self.run_git_command(&["config", "user.name", "Test User"], "Failed to configure git user name")?;
        self.run_git_command(&["config", "commit.gpgsign", "false"], "Failed to disable commit signing")?;
        Ok(())
    }

    /// Writes `files` and commits them.
    pub fn commit_files(&self, files: &[(&str, &str)], message: &str) -> Result<String> {
        for (relative, content) in files {
            let path = self.repo_path.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content)?;
        }
        self.run_git_command(&["add", "."], "Failed to add files to git")?;
        self.run_git_command(
            &["commit", "--quiet", "--allow-empty", "-m", message],
            "Failed to create git commit",
        )?;
        self.rev_parse_head()
    }

    /// Create and checkout a branch
    pub fn create_branch(&self, branch_name: &str) -> Result<()> {
        self.run_git_command(
            &["checkout", "--quiet", "-b", branch_name],
            &format!("Failed to create branch: {branch_name}"),
        )?;
        Ok(())
    }

    /// Get current commit SHA
    pub fn rev_parse_head(&self) -> Result<String> {
        let output = self.run_git_command(&["rev-parse", "HEAD"], "Failed to get current commit SHA")?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// `file://` URL of the repository.
    pub fn file_url(&self) -> String {
        let path = self.repo_path.display().to_string().replace('\\', "/");
        if path.starts_with('/') {
            format!("file://{path}")
        } else {
            format!("file:///{path}")
        }
    }

    /// Return the repository path
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }
}
