//! Filesystem utilities.

pub mod atomic;
pub mod dirs;
pub mod paths;

pub use atomic::atomic_write;
pub use dirs::ensure_dir;
pub use paths::{normalize_path, safe_canonicalize};
