//! Atomic file write operations using temp-and-rename strategy.
//!
//! Readers of a dependency lock document may run in other processes while a
//! restore rewrites it, so the document must never be observed half-written.

use crate::utils::fs::dirs::ensure_dir;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically writes bytes to a file.
///
/// 1. Writes `content` to a uniquely named temporary file in the target's directory
/// 2. Syncs it to disk
/// 3. Renames it over the target
///
/// The temporary file name is unique per call, so concurrent writers of the
/// same target never clobber each other's partial output; the last rename wins.
///
/// ```rust,no_run
/// use docrestore::utils::fs::atomic_write;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// atomic_write(Path::new("en-us.toml"), b"version = 1\n")?;
/// # Ok(())
/// # }
/// ```
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;

    temp.write_all(content)
        .with_context(|| format!("Failed to write temp file for {}", path.display()))?;
    temp.as_file().sync_all().context("Failed to sync file to disk")?;

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}
