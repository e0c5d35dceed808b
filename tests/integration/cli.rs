//! Tests for the `docrestore` binary.

use anyhow::Result;
use assert_cmd::Command;
use docrestore::constants::{APPDATA_PATH_ENV, CONFIG_PATH_ENV};
use docrestore::test_utils::TestEnvironment;
use predicates::prelude::*;

const TEMPLATES: &str = "https://github.com/org/templates";
const COMMIT: &str = "3f2a9c1d5e6b7a8f9c0d1e2f3a4b5c6d7e8f9a0b";

fn docrestore(env: &TestEnvironment) -> Command {
    let mut cmd = Command::cargo_bin("docrestore").unwrap();
    cmd.arg("--app-data")
        .arg(&env.app_data_dir)
        .env_remove(APPDATA_PATH_ENV)
        .env_remove(CONFIG_PATH_ENV)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("docrestore").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("restore"))
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("locks"));
}

#[test]
fn test_resolve_folder() -> Result<()> {
    let env = TestEnvironment::new()?;
    let assets = env.create_folder("assets")?;

    docrestore(&env)
        .arg("resolve")
        .arg(&env.docset_dir)
        .arg("assets")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("assets -> {}", assets.display())));
    Ok(())
}

#[test]
fn test_resolve_restored_git_dependency() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.pin(TEMPLATES, "main", COMMIT, "en-us")?;
    let worktree = env.materialize_worktree(TEMPLATES)?;

    docrestore(&env)
        .arg("resolve")
        .arg(&env.docset_dir)
        .args(["--locale", "en-us", "https://github.com/org/templates#main"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("-> {} @ {COMMIT}", worktree.display())));
    Ok(())
}

#[test]
fn test_resolve_unrestored_fails_with_suggestion() -> Result<()> {
    let env = TestEnvironment::new()?;

    docrestore(&env)
        .arg("resolve")
        .arg(&env.docset_dir)
        .arg("https://github.com/org/templates#main")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("has not been restored"))
        .stderr(predicate::str::contains("docrestore restore"));
    Ok(())
}

#[test]
fn test_resolve_rejects_unsupported_scheme() -> Result<()> {
    let env = TestEnvironment::new()?;

    docrestore(&env)
        .arg("resolve")
        .arg(&env.docset_dir)
        .arg("svn://svn.example.com/docs#trunk")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported package type"));
    Ok(())
}

#[test]
fn test_resolve_allow_missing_json() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = docrestore(&env)
        .arg("resolve")
        .arg(&env.docset_dir)
        .args(["--allow-missing", "--format", "json", "https://github.com/org/templates#main"])
        .output()?;
    assert!(output.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(entries[0]["package"], "https://github.com/org/templates#main");
    assert!(entries[0]["path"].is_null());
    assert!(entries[0]["commit"].is_null());
    Ok(())
}

#[test]
fn test_restore_without_packages() -> Result<()> {
    let env = TestEnvironment::new()?;

    docrestore(&env)
        .arg("restore")
        .arg(&env.docset_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to restore"));
    Ok(())
}

#[test]
fn test_restore_optional_failure_is_skipped() -> Result<()> {
    let env = TestEnvironment::new()?;
    let missing = env.temp_dir.path().join("no-such-repo");
    let url = format!("file://{}", missing.display().to_string().replace('\\', "/"));

    docrestore(&env)
        .arg("restore")
        .arg(&env.docset_dir)
        .args(["--git-timeout-secs", "30", "--optional", &format!("{url}#main")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped"));
    Ok(())
}

#[test]
fn test_locks_clean_on_empty_cache() -> Result<()> {
    let env = TestEnvironment::new()?;

    docrestore(&env)
        .args(["locks", "clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 stale lock file(s)"));
    Ok(())
}

#[test]
fn test_quiet_suppresses_output() -> Result<()> {
    let env = TestEnvironment::new()?;

    docrestore(&env).args(["-q", "locks", "clean"]).assert().success().stdout(predicate::str::is_empty());
    Ok(())
}
