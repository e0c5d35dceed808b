//! Error handling for docrestore
//!
//! Two layers, as elsewhere in the crate:
//! 1. [`RestoreError`] - a strongly-typed enum for every failure the restore core
//!    can report, so callers can branch on the *kind* of failure
//! 2. [`ErrorContext`] - a wrapper adding user-facing details and suggestions,
//!    produced by [`user_friendly_error`] for CLI display
//!
//! # Expected vs. fatal errors
//!
//! Resolution distinguishes the *expected* error family from everything else:
//!
//! - [`RestoreError::NeedRestore`] - the dependency was never restored, or its
//!   cache directory is gone. Remedy: run restore.
//! - [`RestoreError::DirectoryNotFound`] - a folder dependency points at a
//!   directory that does not exist. Remedy: fix the path.
//!
//! [`RestoreError::is_expected`] returns `true` only for these two; the
//! non-throwing resolution variant converts exactly this family into `None`.
//! Lock timeouts are *retryable* ([`RestoreError::is_retryable`]) but not
//! expected, so they always propagate.
//!
//! # Examples
//!
//! ```rust,no_run
//! use docrestore::core::{RestoreError, user_friendly_error};
//!
//! let error = RestoreError::NeedRestore {
//!     package: "https://github.com/org/repo#main".to_string(),
//! };
//! assert!(error.is_expected());
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Suggests running `docrestore restore`
//! ```

use crate::core::SourceInfo;
use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The main error type for the restore core.
///
/// # Error Categories
///
/// ## Resolution (expected)
/// - [`NeedRestore`] - no pinned commit, or cache directory missing
/// - [`DirectoryNotFound`] - folder dependency does not exist
///
/// ## Contract violations
/// - [`UnsupportedPackageType`] - a package description no resolver handles
/// - [`InvalidPackagePath`] - a package string that cannot be parsed
///
/// ## Locking
/// - [`LockTimeout`] - bounded wait elapsed (retryable)
/// - [`LockCancelled`] - the surrounding build was cancelled mid-wait
/// - [`LockRelease`] - one or more handles failed to release at teardown
///
/// ## Restore and storage
/// - [`LockfileParse`] - a dependency lock document is corrupted
/// - [`GitCommandError`] - the git subprocess failed
/// - [`RestoreFailed`] - one or more non-optional packages failed to restore
/// - [`IoError`] - any other filesystem failure
///
/// [`NeedRestore`]: RestoreError::NeedRestore
/// [`DirectoryNotFound`]: RestoreError::DirectoryNotFound
/// [`UnsupportedPackageType`]: RestoreError::UnsupportedPackageType
/// [`InvalidPackagePath`]: RestoreError::InvalidPackagePath
/// [`LockTimeout`]: RestoreError::LockTimeout
/// [`LockCancelled`]: RestoreError::LockCancelled
/// [`LockRelease`]: RestoreError::LockRelease
/// [`LockfileParse`]: RestoreError::LockfileParse
/// [`GitCommandError`]: RestoreError::GitCommandError
/// [`RestoreFailed`]: RestoreError::RestoreFailed
/// [`IoError`]: RestoreError::IoError
#[derive(Error, Debug)]
pub enum RestoreError {
    /// Dependency has not been restored (or its cache was evicted)
    ///
    /// Raised both when the dependency lock has no pinned commit for the
    /// package and when the pinned commit's cache directory is missing on
    /// disk. The remedy is identical in both cases, so the error is too.
    #[error("Dependency '{package}' has not been restored")]
    NeedRestore {
        /// Diagnostic rendering of the package (`url#branch`)
        package: String,
    },

    /// Folder dependency points at a directory that does not exist
    #[error("Directory not found: {location}")]
    DirectoryNotFound {
        /// Where the folder dependency was declared
        location: SourceInfo,
    },

    /// Package description of a kind no resolver supports
    #[error("Unsupported package type: '{package}'")]
    UnsupportedPackageType {
        /// The offending package description
        package: String,
    },

    /// Package string that could not be parsed
    #[error("Invalid package path: '{value}'")]
    InvalidPackagePath {
        /// The raw string
        value: String,
    },

    /// Timed out waiting for an inter-process lock
    #[error("Timeout acquiring lock on {} after {timeout:?}", .path.display())]
    LockTimeout {
        /// Directory the lock protects
        path: PathBuf,
        /// How long we waited
        timeout: Duration,
    },

    /// Lock wait aborted because the operation was cancelled
    #[error("Lock acquisition on {} was cancelled", .path.display())]
    LockCancelled {
        /// Directory the lock protects
        path: PathBuf,
    },

    /// One or more lock handles failed to release
    #[error("Failed to release {} lock(s)", .failures.len())]
    LockRelease {
        /// Each failed directory with the underlying reason
        failures: Vec<(PathBuf, String)>,
    },

    /// Dependency lock document could not be parsed
    #[error("Invalid dependency lock file syntax in {file}")]
    LockfileParse {
        /// Path to the lock document
        file: String,
        /// Parser message
        reason: String,
    },

    /// Git subprocess failed
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed (e.g., "fetch", "worktree add")
        operation: String,
        /// Error output from git
        stderr: String,
    },

    /// Restore finished with failures on non-optional packages
    #[error("Failed to restore {} package(s)", .failures.len())]
    RestoreFailed {
        /// Each failed package with the underlying reason
        failures: Vec<(String, String)>,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RestoreError {
    /// Whether this error belongs to the expected resolution family
    /// (`NeedRestore`, `DirectoryNotFound`).
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        matches!(self, Self::NeedRestore { .. } | Self::DirectoryNotFound { .. })
    }

    /// Whether retrying the same operation later can succeed without user action.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}

impl Clone for RestoreError {
    fn clone(&self) -> Self {
        match self {
            Self::NeedRestore {
                package,
            } => Self::NeedRestore {
                package: package.clone(),
            },
            Self::DirectoryNotFound {
                location,
            } => Self::DirectoryNotFound {
                location: location.clone(),
            },
            Self::UnsupportedPackageType {
                package,
            } => Self::UnsupportedPackageType {
                package: package.clone(),
            },
            Self::InvalidPackagePath {
                value,
            } => Self::InvalidPackagePath {
                value: value.clone(),
            },
            Self::LockTimeout {
                path,
                timeout,
            } => Self::LockTimeout {
                path: path.clone(),
                timeout: *timeout,
            },
            Self::LockCancelled {
                path,
            } => Self::LockCancelled {
                path: path.clone(),
            },
            Self::LockRelease {
                failures,
            } => Self::LockRelease {
                failures: failures.clone(),
            },
            Self::LockfileParse {
                file,
                reason,
            } => Self::LockfileParse {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::GitCommandError {
                operation,
                stderr,
            } => Self::GitCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            Self::RestoreFailed {
                failures,
            } => Self::RestoreFailed {
                failures: failures.clone(),
            },
            // io::Error is not Clone; keep the kind and message
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
        }
    }
}

/// Error with user-facing details and a suggestion.
///
/// Created by [`user_friendly_error`]; [`display`](ErrorContext::display)
/// prints it to stderr with colors.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: RestoreError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
    /// Rendered message for errors that are not a [`RestoreError`]
    pub message: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: RestoreError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
            message: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn headline(&self) -> String {
        self.message.clone().unwrap_or_else(|| self.error.to_string())
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.headline());

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.headline())?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`RestoreError`] anywhere in the error chain, then
/// [`std::io::Error`], and falls back to the rendered error chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(restore_error) = error.chain().find_map(|e| e.downcast_ref::<RestoreError>()) {
        return create_error_context(restore_error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        let kind = io_error.kind();
        let ctx = ErrorContext::new(RestoreError::IoError(std::io::Error::new(
            kind,
            io_error.to_string(),
        )));
        match kind {
            std::io::ErrorKind::PermissionDenied => {
                return ctx
                    .with_suggestion("Check ownership and permissions of the docrestore app data directory")
                    .with_details("The cache, lock files and dependency lock store must be writable");
            }
            std::io::ErrorKind::NotFound => {
                return ctx
                    .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => return ctx,
        }
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    let mut ctx = ErrorContext::new(RestoreError::IoError(std::io::Error::other(message.clone())));
    ctx.message = Some(message);
    ctx
}

/// Map each [`RestoreError`] variant to an [`ErrorContext`] with tailored suggestions.
fn create_error_context(error: &RestoreError) -> ErrorContext {
    match error {
        RestoreError::NeedRestore { package } => ErrorContext::new(error.clone())
            .with_suggestion("Run 'docrestore restore' for this docset before building")
            .with_details(format!(
                "No restored commit is recorded for '{package}', or its cache directory was removed"
            )),

        RestoreError::DirectoryNotFound { location } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Fix the folder dependency {location} so it points at an existing directory relative to the docset root"
            )),

        RestoreError::UnsupportedPackageType { .. } | RestoreError::InvalidPackagePath { .. } => {
            ErrorContext::new(error.clone())
                .with_suggestion("Declare dependencies as a relative folder path or as 'url#branch'")
        }

        RestoreError::LockTimeout { path, .. } => ErrorContext::new(error.clone())
            .with_suggestion("Another process is restoring this dependency. Retry once it finishes, or raise the lock timeout")
            .with_details(format!("The cache directory {} is held exclusively", path.display())),

        RestoreError::LockRelease { failures } => ErrorContext::new(error.clone()).with_details(
            failures
                .iter()
                .map(|(path, reason)| format!("{}: {reason}", path.display()))
                .collect::<Vec<_>>()
                .join("\n"),
        ),

        RestoreError::LockfileParse { file, .. } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Delete {file} and run 'docrestore restore' to regenerate it"))
            .with_details("The dependency lock file may have been edited by hand or truncated"),

        RestoreError::GitCommandError { operation, stderr } => ErrorContext::new(error.clone())
            .with_suggestion(match operation.as_str() {
                op if op.contains("fetch") => "Check the repository URL, the branch name and your network connection",
                op if op.contains("worktree") => "Remove the cache directory for this repository and restore again",
                _ => "Try running the git command manually for more details",
            })
            .with_details(stderr.trim().to_string()),

        RestoreError::RestoreFailed { failures } => ErrorContext::new(error.clone()).with_details(
            failures
                .iter()
                .map(|(package, reason)| format!("{package}: {reason}"))
                .collect::<Vec<_>>()
                .join("\n"),
        ),

        _ => ErrorContext::new(error.clone()),
    }
}
