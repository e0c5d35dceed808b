//! Restore followed by resolution, with an in-process fetcher standing in for git.

use anyhow::{Result, bail};
use docrestore::cache::lock::{InterProcessReaderWriterLock, LockOptions};
use docrestore::core::RestoreError;
use docrestore::lockfile::DependencyLock;
use docrestore::package::{PackageFetchOptions, PackagePath, RestoreGitFlags};
use docrestore::restore::{FetchRequest, GitFetcher, restore_packages};
use docrestore::test_utils::TestEnvironment;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const TEMPLATES: &str = "https://github.com/org/templates";
const SAMPLES: &str = "https://github.com/org/samples";
const BROKEN: &str = "https://github.com/org/broken";

/// Materializes the working tree and derives a commit from the branch name.
#[derive(Default)]
struct DirectoryFetcher {
    fetches: AtomicUsize,
}

impl GitFetcher for DirectoryFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if request.url == BROKEN {
            bail!("remote rejected the fetch");
        }
        tokio::fs::create_dir_all(&request.worktree).await?;
        tokio::fs::write(request.worktree.join("BRANCH"), &request.branch).await?;
        Ok(format!("{:0>40}", request.branch.len()))
    }
}

#[tokio::test]
async fn test_restore_then_resolve() -> Result<()> {
    let env = TestEnvironment::new()?;
    let fetcher = DirectoryFetcher::default();
    let packages = vec![
        (PackagePath::git(TEMPLATES, "main"), PackageFetchOptions::NONE),
        (PackagePath::git(SAMPLES, "live"), PackageFetchOptions::DEPTH_ONE),
        (PackagePath::folder("assets"), PackageFetchOptions::NONE),
    ];

    let summary =
        restore_packages(&env.app_data(), &env.docset_dir, "en-us", &packages, &fetcher, &env.lock_options())
            .await?;
    assert_eq!(summary.restored.len(), 2);
    assert!(summary.skipped.is_empty());
    assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 2);

    let map = env.map("en-us")?;
    let (path, commit) =
        map.get_restore_git_path(&PackagePath::git(SAMPLES, "live"), RestoreGitFlags::NONE).await?;
    assert_eq!(path, env.app_data().worktree_dir(SAMPLES));
    assert_eq!(std::fs::read_to_string(path.join("BRANCH"))?, "live");
    assert_eq!(commit, Some(format!("{:0>40}", 4)));

    // Another locale has its own store
    let other = env.map("fr-fr")?;
    assert_eq!(
        other.try_get_restore_git_path(&PackagePath::git(SAMPLES, "live"), RestoreGitFlags::NONE).await?,
        None
    );
    Ok(())
}

#[tokio::test]
async fn test_docset_spelling_does_not_split_the_store() -> Result<()> {
    let env = TestEnvironment::new()?;
    let fetcher = DirectoryFetcher::default();
    let packages = vec![(PackagePath::git(TEMPLATES, "main"), PackageFetchOptions::NONE)];
    let detour = env.docset_dir.join("..").join(env.docset_dir.file_name().unwrap()).join(".");

    restore_packages(&env.app_data(), &detour, "en-us", &packages, &fetcher, &env.lock_options()).await?;

    let map = env.map("en-us")?;
    let (_, commit) =
        map.get_restore_git_path(&PackagePath::git(TEMPLATES, "main"), RestoreGitFlags::NONE).await?;
    assert_eq!(commit, Some(format!("{:0>40}", 4)));
    Ok(())
}

#[tokio::test]
async fn test_optional_failure_leaves_package_unresolvable() -> Result<()> {
    let env = TestEnvironment::new()?;
    let fetcher = DirectoryFetcher::default();
    let packages = vec![
        (PackagePath::git(TEMPLATES, "main"), PackageFetchOptions::NONE),
        (PackagePath::git(BROKEN, "main"), PackageFetchOptions::IGNORE_ERROR),
    ];

    let summary =
        restore_packages(&env.app_data(), &env.docset_dir, "en-us", &packages, &fetcher, &env.lock_options())
            .await?;
    assert_eq!(summary.restored.len(), 1);
    assert_eq!(summary.skipped.len(), 1);
    assert!(summary.skipped[0].reason.contains("remote rejected"));

    let map = env.map("en-us")?;
    assert!(map.try_get_restore_git_path(&PackagePath::git(TEMPLATES, "main"), RestoreGitFlags::NONE).await?.is_some());
    assert_eq!(
        map.try_get_restore_git_path(&PackagePath::git(BROKEN, "main"), RestoreGitFlags::NONE).await?,
        None
    );
    Ok(())
}

#[tokio::test]
async fn test_required_failure_still_records_successes() -> Result<()> {
    let env = TestEnvironment::new()?;
    let fetcher = DirectoryFetcher::default();
    let packages = vec![
        (PackagePath::git(TEMPLATES, "main"), PackageFetchOptions::NONE),
        (PackagePath::git(BROKEN, "main"), PackageFetchOptions::NONE),
    ];

    let err = restore_packages(&env.app_data(), &env.docset_dir, "en-us", &packages, &fetcher, &env.lock_options())
        .await
        .unwrap_err();
    let Some(RestoreError::RestoreFailed { failures }) = err.downcast_ref::<RestoreError>() else {
        panic!("expected RestoreFailed, got {err:?}");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, format!("{BROKEN}#main"));

    let lock = DependencyLock::load(&env.app_data().dependency_lock_file(&env.docset_dir, "en-us"))?;
    assert!(lock.get_git_lock(TEMPLATES, "main").is_some());
    assert!(lock.get_git_lock(BROKEN, "main").is_none());
    Ok(())
}

#[tokio::test]
async fn test_restore_waits_for_readers() -> Result<()> {
    let env = TestEnvironment::new()?;
    let fetcher = DirectoryFetcher::default();
    let app_data = env.app_data();

    let reader = InterProcessReaderWriterLock::acquire_reader(
        &app_data.lock_dir(),
        &app_data.git_dir(TEMPLATES),
        &env.lock_options(),
    )
    .await?;

    let packages = vec![(PackagePath::git(TEMPLATES, "main"), PackageFetchOptions::NONE)];
    let result = restore_packages(
        &app_data,
        &env.docset_dir,
        "en-us",
        &packages,
        &fetcher,
        &LockOptions::new(Duration::from_millis(100)),
    )
    .await;

    assert!(result.is_err(), "a writer cannot fetch while a build reads the cache");
    assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 0);

    reader.release()?;
    let summary =
        restore_packages(&app_data, &env.docset_dir, "en-us", &packages, &fetcher, &env.lock_options()).await?;
    assert_eq!(summary.restored.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_restore_replaces_previous_pin() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.pin(TEMPLATES, "main", "0123456789abcdef0123456789abcdef01234567", "en-us")?;
    let fetcher = DirectoryFetcher::default();
    let packages = vec![(PackagePath::git(TEMPLATES, "main"), PackageFetchOptions::NONE)];

    restore_packages(&env.app_data(), &env.docset_dir, "en-us", &packages, &fetcher, &env.lock_options()).await?;

    let map = env.map("en-us")?;
    let (_, commit) = map.get_restore_git_path(&packages[0].0, RestoreGitFlags::NONE).await?;
    assert_eq!(commit, Some(format!("{:0>40}", 4)));
    Ok(())
}
