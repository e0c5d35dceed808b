//! Path identity helpers.
//!
//! Lock files and dependency lock documents are keyed by a hash of a path, so
//! every spelling of one directory (`docs`, `docs/`, `x/../docs`, a symlink to
//! it) has to reduce to the same key.

use std::path::{Component, Path, PathBuf};

/// Lexically removes `.` and `..` components.
///
/// No filesystem access. `..` never climbs above the root, and leading `..`
/// components of a relative path are kept.
///
/// ```rust
/// use docrestore::utils::fs::normalize_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(normalize_path(Path::new("/work/x/../docs/./")), PathBuf::from("/work/docs"));
/// assert_eq!(normalize_path(Path::new("../src/./lib.rs")), PathBuf::from("../src/lib.rs"));
/// ```
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Canonical form of `path`, also for paths that do not exist yet.
///
/// The longest existing ancestor is canonicalized (resolving symlinks and
/// `..`) and the remaining components are appended after lexical
/// normalization. Falls back to the normalized absolute path when nothing can
/// be canonicalized.
#[must_use]
pub fn safe_canonicalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let components: Vec<Component<'_>> = absolute.components().collect();

    for split in (1..=components.len()).rev() {
        let existing: PathBuf = components[..split].iter().collect();
        if let Ok(mut canonical) = existing.canonicalize() {
            canonical.extend(&components[split..]);
            return normalize_path(&canonical);
        }
    }

    normalize_path(&absolute)
}
