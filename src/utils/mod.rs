//! Cross-platform utilities shared across docrestore.
//!
//! - [`fs`] - atomic writes and directory helpers
//! - [`hash`] - stable hashes for on-disk names
//! - [`platform`] - platform detection and the git executable name

pub mod fs;
pub mod hash;
pub mod platform;
