//! Integration test suite for docrestore
//!
//! End-to-end tests of resolution, locking, restore and the CLI against
//! temporary cache roots. Run with:
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **resolution**: `RestoreGitMap` resolution scenarios, lock sharing and teardown
//! - **locking**: cross-handle reader/writer exclusion, timeouts and cancellation
//! - **restore**: `restore_packages` with an in-process fetcher
//! - **git_fetch**: restore through the system git from local `file://` repositories
//! - **cli**: the `docrestore` binary

mod cli;
mod git_fetch;
mod locking;
mod restore;
