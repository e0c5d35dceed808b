//! Loading and saving dependency lock documents.

use anyhow::{Context, Result};
use std::path::Path;

use crate::core::RestoreError;
use crate::utils::fs::atomic_write;

use super::DependencyLock;

const HEADER: &str = "# Auto-generated by docrestore - do not edit by hand\n";

impl DependencyLock {
    /// Loads a document from disk.
    ///
    /// A missing or empty file is an empty document, not an error: it simply
    /// means nothing was restored yet. Malformed TOML, or a document written by
    /// a newer format version, is [`RestoreError::LockfileParse`].
    ///
    /// ```rust,no_run
    /// use docrestore::lockfile::DependencyLock;
    /// use std::path::Path;
    ///
    /// # fn example() -> Result<(), docrestore::core::RestoreError> {
    /// let lock = DependencyLock::load(Path::new("missing.toml"))?;
    /// assert!(lock.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    pub fn load(path: &Path) -> Result<Self, RestoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(RestoreError::IoError(e)),
        };

        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        let lock: Self = toml::from_str(&content).map_err(|e| RestoreError::LockfileParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;

        if lock.version > Self::CURRENT_VERSION {
            return Err(RestoreError::LockfileParse {
                file: path.display().to_string(),
                reason: format!(
                    "version {} is newer than supported version {}",
                    lock.version,
                    Self::CURRENT_VERSION
                ),
            });
        }

        Ok(lock)
    }

    /// Saves the document with a temp-file-and-rename write.
    ///
    /// Builds in other processes may read the document at any moment, so it is
    /// never left partially written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = toml::to_string_pretty(self).with_context(|| {
            format!("Failed to serialize dependency lock for {}", path.display())
        })?;

        let mut content = String::with_capacity(HEADER.len() + body.len());
        content.push_str(HEADER);
        content.push_str(&body);

        atomic_write(path, content.as_bytes())
            .with_context(|| format!("Failed to write dependency lock: {}", path.display()))
    }
}
