//! Fetching declared git dependencies into the shared cache.
//!
//! Restore is the writer side of the cache protocol: it takes the exclusive
//! lock on a repository's cache root, brings the repository to the head of the
//! requested branch, and records the resulting commit in the docset's
//! dependency lock so later builds resolve to exactly that commit.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::AppData;
use crate::cache::lock::{InterProcessReaderWriterLock, LockOptions};
use crate::core::RestoreError;
use crate::lockfile::DependencyLock;
use crate::package::{PackageFetchOptions, PackagePath};

/// Everything a fetcher needs to restore one `(url, branch)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Remote URL
    pub url: String,
    /// Branch to fetch
    pub branch: String,
    /// Repository storage; may not exist yet
    pub cache_root: PathBuf,
    /// Working-tree slot to check the fetched commit out into
    pub worktree: PathBuf,
    /// Shallow fetch and error handling options
    pub options: PackageFetchOptions,
}

/// Brings a cache root up to date with a remote branch.
///
/// Called with the exclusive lock on `request.cache_root` held, so an
/// implementation may freely rewrite anything under it.
pub trait GitFetcher: Send + Sync {
    /// Fetches `request.branch` and checks it out; returns the commit.
    fn fetch(&self, request: &FetchRequest) -> impl Future<Output = Result<String>> + Send;
}

/// A package restored to a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredPackage {
    /// The package
    pub package: PackagePath,
    /// Commit it was restored to
    pub commit: String,
}

/// An optional package whose restore failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPackage {
    /// The package
    pub package: PackagePath,
    /// Why the restore failed
    pub reason: String,
}

/// Outcome of [`restore_packages`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Packages now pinned in the dependency lock
    pub restored: Vec<RestoredPackage>,
    /// Optional packages that failed and were left alone
    pub skipped: Vec<SkippedPackage>,
}

struct Outcome {
    package: PackagePath,
    options: PackageFetchOptions,
    result: Result<String>,
}

/// Restores every git package in `packages` for `docset_root` and `locale`.
///
/// Folder packages need no restore and are ignored. A package declared more
/// than once is restored once, and is only optional (or shallow) if every
/// declaration says so. Distinct repositories are restored concurrently;
/// branches of one repository share its single working tree and are restored
/// one after another.
///
/// Commits of successful packages are saved to the dependency lock even when
/// other packages fail. A failed package marked
/// [`PackageFetchOptions::IGNORE_ERROR`] is logged and reported in
/// [`RestoreSummary::skipped`]; any other failure turns the whole call into
/// [`RestoreError::RestoreFailed`] once every sibling has finished.
pub async fn restore_packages<F: GitFetcher>(
    app_data: &AppData,
    docset_root: &Path,
    locale: &str,
    packages: &[(PackagePath, PackageFetchOptions)],
    fetcher: &F,
    lock_options: &LockOptions,
) -> Result<RestoreSummary> {
    let mut wanted: BTreeMap<(String, String), PackageFetchOptions> = BTreeMap::new();
    for (package, options) in packages {
        if let PackagePath::Git { url, branch } = package {
            wanted
                .entry((url.clone(), branch.clone()))
                .and_modify(|merged| *merged = merged.intersection(*options))
                .or_insert(*options);
        }
    }

    let mut by_url: BTreeMap<String, Vec<(String, PackageFetchOptions)>> = BTreeMap::new();
    for ((url, branch), options) in wanted {
        by_url.entry(url).or_default().push((branch, options));
    }

    debug!(
        docset = %docset_root.display(),
        repositories = by_url.len(),
        "Restoring git dependencies"
    );

    let repositories = by_url
        .into_iter()
        .map(|(url, branches)| restore_repository(app_data, url, branches, fetcher, lock_options));
    let outcomes = join_all(repositories).await;

    let mut summary = RestoreSummary::default();
    let mut failures = Vec::new();
    for outcome in outcomes.into_iter().flatten() {
        match outcome.result {
            Ok(commit) => {
                info!(package = %outcome.package, %commit, "Restored dependency");
                summary.restored.push(RestoredPackage {
                    package: outcome.package,
                    commit,
                });
            }
            Err(e) if outcome.options.contains(PackageFetchOptions::IGNORE_ERROR) => {
                let reason = format!("{e:#}");
                warn!(package = %outcome.package, error = %reason, "Ignoring failed restore of optional dependency");
                summary.skipped.push(SkippedPackage {
                    package: outcome.package,
                    reason,
                });
            }
            Err(e) => failures.push((outcome.package.to_string(), format!("{e:#}"))),
        }
    }

    if !summary.restored.is_empty() {
        record_commits(app_data, docset_root, locale, &summary.restored, lock_options).await?;
    }

    if !failures.is_empty() {
        return Err(RestoreError::RestoreFailed {
            failures,
        }
        .into());
    }

    info!(
        restored = summary.restored.len(),
        skipped = summary.skipped.len(),
        "Restore finished"
    );
    Ok(summary)
}

async fn restore_repository<F: GitFetcher>(
    app_data: &AppData,
    url: String,
    branches: Vec<(String, PackageFetchOptions)>,
    fetcher: &F,
    lock_options: &LockOptions,
) -> Vec<Outcome> {
    let mut outcomes = Vec::with_capacity(branches.len());
    for (branch, options) in branches {
        let request = FetchRequest {
            cache_root: app_data.git_dir(&url),
            worktree: app_data.worktree_dir(&url),
            url: url.clone(),
            branch,
            options,
        };
        let result = restore_one(&app_data.lock_dir(), &request, fetcher, lock_options).await;
        outcomes.push(Outcome {
            package: PackagePath::git(request.url, request.branch),
            options,
            result,
        });
    }
    outcomes
}

async fn restore_one<F: GitFetcher>(
    lock_dir: &Path,
    request: &FetchRequest,
    fetcher: &F,
    lock_options: &LockOptions,
) -> Result<String> {
    let writer =
        InterProcessReaderWriterLock::acquire_writer(lock_dir, &request.cache_root, lock_options)
            .await?;

    let result = fetcher.fetch(request).await;

    if let Err(e) = writer.release() {
        warn!(path = %request.cache_root.display(), error = %e, "Failed to release cache lock");
    }

    result.with_context(|| format!("Failed to restore {}#{}", request.url, request.branch))
}

/// Merges `restored` into the stored dependency lock.
///
/// The document itself is guarded by a writer lock so two restores of the same
/// docset never drop each other's entries.
async fn record_commits(
    app_data: &AppData,
    docset_root: &Path,
    locale: &str,
    restored: &[RestoredPackage],
    lock_options: &LockOptions,
) -> Result<()> {
    let lock_file = app_data.dependency_lock_file(docset_root, locale);
    let writer =
        InterProcessReaderWriterLock::acquire_writer(&app_data.lock_dir(), &lock_file, lock_options)
            .await?;

    let mut lock = DependencyLock::load(&lock_file)?;
    for entry in restored {
        if let PackagePath::Git { url, branch } = &entry.package {
            lock.set_git_lock(url, branch, entry.commit.clone());
        }
    }
    lock.save(&lock_file)?;

    writer.release().with_context(|| {
        format!("Failed to release dependency lock guard for {}", lock_file.display())
    })?;

    debug!(entries = lock.len(), "Saved dependency lock to {}", lock_file.display());
    Ok(())
}
