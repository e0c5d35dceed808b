//! Dependency source descriptions.
//!
//! A docset declares its dependencies as [`PackagePath`] values: either a
//! folder relative to the docset root, or a git repository pinned to a branch.
//! Resolution behaviour is tuned with [`RestoreGitFlags`]; restore behaviour
//! with [`PackageFetchOptions`].
//!
//! # String form
//!
//! Packages are written as plain strings in configuration and on the command
//! line:
//!
//! ```text
//! assets                                   -> Folder { path: "assets" }
//! https://github.com/org/repo#live         -> Git { url, branch: "live" }
//! https://github.com/org/repo              -> Git { url, branch: "master" }
//! git@github.com:org/repo.git#main         -> Git { url, branch: "main" }
//! ```

use crate::constants::DEFAULT_BRANCH;
use crate::core::RestoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// An immutable description of a dependency source.
///
/// Equality, ordering and hashing cover the whole variant so the value can be
/// used directly as a lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PackagePath {
    /// Local folder, resolved relative to the docset root
    Folder {
        /// Relative path of the folder
        path: PathBuf,
    },
    /// Git repository reference
    Git {
        /// Remote URL
        url: String,
        /// Branch to restore
        branch: String,
    },
}

impl PackagePath {
    /// Creates a folder package.
    pub fn folder(path: impl AsRef<Path>) -> Self {
        Self::Folder {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates a git package pinned to `branch`.
    pub fn git(url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self::Git {
            url: url.into(),
            branch: branch.into(),
        }
    }
}

/// Whether a string names a git remote rather than a local folder.
fn is_git_remote(value: &str) -> bool {
    const SCHEMES: [&str; 5] = ["http://", "https://", "ssh://", "git://", "file://"];
    SCHEMES.iter().any(|scheme| value.starts_with(scheme))
        || value.starts_with("git@")
        || value.ends_with(".git")
}

impl FromStr for PackagePath {
    type Err = RestoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.is_empty() {
            return Err(RestoreError::InvalidPackagePath {
                value: s.to_string(),
            });
        }

        let (remote, fragment) = match value.split_once('#') {
            Some((remote, fragment)) => (remote, Some(fragment)),
            None => (value, None),
        };

        if !is_git_remote(remote) {
            // A URL with any other scheme (svn://, ftp://) is not a folder either
            if remote.contains("://") {
                return Err(RestoreError::UnsupportedPackageType {
                    package: value.to_string(),
                });
            }
            return Ok(Self::folder(value));
        }

        let branch = fragment.filter(|b| !b.trim().is_empty()).unwrap_or(DEFAULT_BRANCH);
        Ok(Self::git(remote, branch.trim()))
    }
}

impl TryFrom<String> for PackagePath {
    type Error = RestoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PackagePath> for String {
    fn from(value: PackagePath) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PackagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folder { path } => write!(f, "{}", path.display()),
            Self::Git { url, branch } => write!(f, "{url}#{branch}"),
        }
    }
}

/// Flags controlling how a git package resolves to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RestoreGitFlags(u8);

impl RestoreGitFlags {
    /// No flags: resolve to the checked-out working tree.
    pub const NONE: Self = Self(0);
    /// Resolve to the raw repository storage (the cache root) instead.
    pub const BARE: Self = Self(0b0001);

    /// Whether every bit in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no flag is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for RestoreGitFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RestoreGitFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Options applied while restoring (fetching) a package.
///
/// Resolution ignores these entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PackageFetchOptions(u8);

impl PackageFetchOptions {
    /// Full-history fetch, failures are fatal.
    pub const NONE: Self = Self(0);
    /// Shallow fetch (`--depth 1`).
    pub const DEPTH_ONE: Self = Self(0b0001);
    /// A failed fetch is logged and does not fail the overall restore.
    ///
    /// Used for optional dependencies such as fallback branches.
    pub const IGNORE_ERROR: Self = Self(0b0010);

    /// Whether every bit in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no option is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Options set in both `self` and `other`.
    ///
    /// Merges duplicate declarations of one package: it is only optional, or
    /// only shallow, if every declaration says so.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }
}

impl BitOr for PackageFetchOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PackageFetchOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
