//! Restores through the system git from local repositories.
//!
//! Skipped when git is not installed.

use anyhow::Result;
use docrestore::git::{GitCommandFetcher, is_git_installed};
use docrestore::package::{PackageFetchOptions, PackagePath, RestoreGitFlags};
use docrestore::restore::restore_packages;
use docrestore::test_utils::{TestEnvironment, TestGit};

fn git_available() -> bool {
    if is_git_installed() {
        true
    } else {
        eprintln!("git not installed, skipping");
        false
    }
}

#[tokio::test]
async fn test_restore_checks_out_branch_commit() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let env = TestEnvironment::new()?;
    let upstream = TestGit::create_repo(
        env.temp_dir.path().join("upstream"),
        "main",
        &[("index.md", "# Templates\n"), ("partials/header.md", "header\n")],
    )?;
    let expected = upstream.rev_parse_head()?;
    let package = PackagePath::git(upstream.file_url(), "main");

    let summary = restore_packages(
        &env.app_data(),
        &env.docset_dir,
        "en-us",
        &[(package.clone(), PackageFetchOptions::NONE)],
        &GitCommandFetcher::default(),
        &env.lock_options(),
    )
    .await?;
    assert_eq!(summary.restored[0].commit, expected);

    let map = env.map("en-us")?;
    let (worktree, commit) = map.get_restore_git_path(&package, RestoreGitFlags::NONE).await?;
    assert_eq!(commit.as_deref(), Some(expected.as_str()));
    assert_eq!(std::fs::read_to_string(worktree.join("partials/header.md"))?, "header\n");

    let (bare, _) = map.get_restore_git_path(&package, RestoreGitFlags::BARE).await?;
    assert!(bare.join("HEAD").is_file());
    Ok(())
}

#[tokio::test]
async fn test_restore_again_moves_to_new_commit() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let env = TestEnvironment::new()?;
    let upstream =
        TestGit::create_repo(env.temp_dir.path().join("upstream"), "main", &[("index.md", "v1\n")])?;
    let package = PackagePath::git(upstream.file_url(), "main");
    let packages = [(package.clone(), PackageFetchOptions::DEPTH_ONE)];
    let fetcher = GitCommandFetcher::default();

    restore_packages(&env.app_data(), &env.docset_dir, "en-us", &packages, &fetcher, &env.lock_options())
        .await?;
    let second = upstream.commit_files(&[("index.md", "v2\n")], "Update index")?;
    restore_packages(&env.app_data(), &env.docset_dir, "en-us", &packages, &fetcher, &env.lock_options())
        .await?;

    let map = env.map("en-us")?;
    let (worktree, commit) = map.get_restore_git_path(&package, RestoreGitFlags::NONE).await?;
    assert_eq!(commit, Some(second));
    assert_eq!(std::fs::read_to_string(worktree.join("index.md"))?, "v2\n");
    Ok(())
}

#[tokio::test]
async fn test_branches_of_one_repository_share_the_worktree() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let env = TestEnvironment::new()?;
    let upstream =
        TestGit::create_repo(env.temp_dir.path().join("upstream"), "main", &[("index.md", "main\n")])?;
    let main_commit = upstream.rev_parse_head()?;
    upstream.create_branch("live")?;
    let live_commit = upstream.commit_files(&[("index.md", "live\n")], "Live content")?;

    let url = upstream.file_url();
    let summary = restore_packages(
        &env.app_data(),
        &env.docset_dir,
        "en-us",
        &[
            (PackagePath::git(&url, "main"), PackageFetchOptions::NONE),
            (PackagePath::git(&url, "live"), PackageFetchOptions::NONE),
        ],
        &GitCommandFetcher::default(),
        &env.lock_options(),
    )
    .await?;
    assert_eq!(summary.restored.len(), 2);

    let map = env.map("en-us")?;
    let (main_path, main) = map.get_restore_git_path(&PackagePath::git(&url, "main"), RestoreGitFlags::NONE).await?;
    let (live_path, live) = map.get_restore_git_path(&PackagePath::git(&url, "live"), RestoreGitFlags::NONE).await?;

    assert_eq!(main, Some(main_commit));
    assert_eq!(live, Some(live_commit));
    assert_eq!(main_path, live_path);
    assert_eq!(map.acquisition_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_branch_is_skipped_when_optional() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let env = TestEnvironment::new()?;
    let upstream =
        TestGit::create_repo(env.temp_dir.path().join("upstream"), "main", &[("index.md", "main\n")])?;
    let package = PackagePath::git(upstream.file_url(), "no-such-branch");

    let summary = restore_packages(
        &env.app_data(),
        &env.docset_dir,
        "en-us",
        &[(package.clone(), PackageFetchOptions::IGNORE_ERROR)],
        &GitCommandFetcher::default(),
        &env.lock_options(),
    )
    .await?;

    assert!(summary.restored.is_empty());
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].package, package);
    Ok(())
}
