//! Stable hashing for on-disk names.
//!
//! Cache directory names and lock file names are derived from URLs and paths.
//! They must be identical across runs, processes and machines, so they use
//! SHA-256 rather than `std`'s randomized hasher.

use sha2::{Digest, Sha256};

/// Full lowercase hex SHA-256 of `value`.
#[must_use]
pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// First `bytes` bytes of the SHA-256 of `value`, as lowercase hex.
#[must_use]
pub fn short_hash(value: &str, bytes: usize) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(&digest[..bytes.min(digest.len())])
}
