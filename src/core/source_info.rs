//! Logical source locations attached to diagnostics.
//!
//! A dependency is usually declared in some configuration file. When resolution
//! fails, the error should point back at that declaration rather than at the
//! cache internals, so errors carry a [`SourceInfo`].

use std::fmt;
use std::path::{Path, PathBuf};

/// Where a value came from, for diagnostics.
///
/// `value` is the textual form of the offending value (for packages, the
/// `Display` rendering of the [`PackagePath`](crate::package::PackagePath)).
/// `file` is optional because packages can also come from the command line or
/// be constructed in code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceInfo {
    /// The offending value as written by the user
    pub value: String,
    /// Docset root or configuration file that declared the value, if known
    pub file: Option<PathBuf>,
}

impl SourceInfo {
    /// Creates a source info with no file location.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            file: None,
        }
    }

    /// Attaches the declaring file.
    #[must_use]
    pub fn with_file(mut self, file: impl AsRef<Path>) -> Self {
        self.file = Some(file.as_ref().to_path_buf());
        self
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.value)?;
        if let Some(file) = &self.file {
            write!(f, " ({})", file.display())?;
        }
        Ok(())
    }
}
