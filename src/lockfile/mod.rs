//! Dependency lock documents.
//!
//! A restore records, for every git dependency it fetched, the exact commit it
//! resolved. Builds later read that record to learn which commit each
//! dependency is pinned to. The record is scoped to one docset and one locale
//! and lives in the process-wide store under the app data root:
//!
//! ```text
//! {app_data}/dependency-lock/{docset-hash}/{locale}.toml
//! ```
//!
//! # Format
//!
//! ```toml
//! # Auto-generated by docrestore - do not edit by hand
//! version = 1
//!
//! [git."https://github.com/org/templates#main"]
//! commit = "4f1c0d3a9b2e..."
//! restored_at = "2026-10-17T09:12:44Z"
//! ```
//!
//! Entries are keyed by `url#branch`. An absent entry and an entry whose
//! `commit` is missing both mean "not restored".

mod io;
mod provider;

pub use provider::DependencyLockProvider;

use crate::constants::DEPENDENCY_LOCK_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pinned state of one git dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGitLock {
    /// Commit the restore resolved, or `None` if it never completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    /// When the commit was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_at: Option<DateTime<Utc>>,
}

impl DependencyGitLock {
    /// Entry pinned to `commit`, stamped with the current time.
    #[must_use]
    pub fn pinned(commit: impl Into<String>) -> Self {
        Self {
            commit: Some(commit.into()),
            restored_at: Some(Utc::now()),
        }
    }
}

/// The dependency lock document for one docset and locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyLock {
    /// Format version, bumped on incompatible changes.
    #[serde(default = "current_version")]
    pub version: u32,

    /// Git entries keyed by `url#branch`.
    #[serde(default)]
    pub git: BTreeMap<String, DependencyGitLock>,
}

const fn current_version() -> u32 {
    DEPENDENCY_LOCK_VERSION
}

impl Default for DependencyLock {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyLock {
    /// Current format version.
    pub const CURRENT_VERSION: u32 = DEPENDENCY_LOCK_VERSION;

    /// Creates an empty document.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            version: DEPENDENCY_LOCK_VERSION,
            git: BTreeMap::new(),
        }
    }

    /// Key under which the `(url, branch)` entry is stored.
    #[must_use]
    pub fn git_key(url: &str, branch: &str) -> String {
        format!("{url}#{branch}")
    }

    /// Exact lookup of the `(url, branch)` entry. Never falls back to another branch.
    #[must_use]
    pub fn get_git_lock(&self, url: &str, branch: &str) -> Option<&DependencyGitLock> {
        self.git.get(&Self::git_key(url, branch))
    }

    /// Pins `(url, branch)` to `commit`, replacing any previous entry.
    pub fn set_git_lock(&mut self, url: &str, branch: &str, commit: impl Into<String>) {
        self.git.insert(Self::git_key(url, branch), DependencyGitLock::pinned(commit));
    }

    /// Whether the document has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.git.is_empty()
    }

    /// Number of git entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.git.len()
    }
}
