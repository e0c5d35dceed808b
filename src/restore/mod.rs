//! Dependency restore and resolution.
//!
//! Two sides share the cache under the app data root:
//!
//! - **Restore** ([`restore_packages`]) fetches git dependencies into the cache
//!   under an exclusive lock and pins the fetched commits in the docset's
//!   dependency lock.
//! - **Resolution** ([`RestoreGitMap`]) runs during a build. It maps each
//!   declared dependency to a directory and pinned commit, and holds a shared
//!   lock on every cache it handed out until the build releases the map.
//!
//! Resolution never fetches. A git dependency that was never restored, or
//! whose cache was removed, fails with
//! [`RestoreError::NeedRestore`](crate::core::RestoreError::NeedRestore).

mod git_map;
mod restorer;

pub use git_map::{ResolvedPath, RestoreGitMap};
pub use restorer::{
    FetchRequest, GitFetcher, RestoreSummary, RestoredPackage, SkippedPackage, restore_packages,
};
