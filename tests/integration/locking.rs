//! Reader/writer exclusion between independent lock handles.
//!
//! Each handle opens its own file description, so two handles in one process
//! contend exactly like two processes would.

use anyhow::Result;
use docrestore::cache::lock::{InterProcessReaderWriterLock, LockMode, LockOptions, cleanup_stale_locks};
use docrestore::core::RestoreError;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn setup() -> Result<(TempDir, PathBuf, PathBuf)> {
    docrestore::test_utils::init_test_logging(None);
    let temp = TempDir::new()?;
    let lock_dir = temp.path().join("locks");
    let protected = temp.path().join("git").join("templates-0a1b2c3d");
    Ok((temp, lock_dir, protected))
}

#[tokio::test]
async fn test_writer_waits_for_reader_release() -> Result<()> {
    let (_temp, lock_dir, protected) = setup()?;

    let reader =
        InterProcessReaderWriterLock::acquire_reader(&lock_dir, &protected, &LockOptions::default()).await?;

    let waiting_lock_dir = lock_dir.clone();
    let waiting_path = protected.clone();
    let writer = tokio::spawn(async move {
        let started = Instant::now();
        let lock = InterProcessReaderWriterLock::acquire_writer(
            &waiting_lock_dir,
            &waiting_path,
            &LockOptions::new(Duration::from_secs(5)),
        )
        .await?;
        Ok::<_, RestoreError>((lock, started.elapsed()))
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!writer.is_finished(), "writer must wait while a reader holds the lock");
    reader.release()?;

    let (lock, waited) = writer.await??;
    assert_eq!(lock.mode(), LockMode::Exclusive);
    assert!(waited >= Duration::from_millis(150));
    lock.release()?;
    Ok(())
}

#[tokio::test]
async fn test_readers_wait_for_writer_release() -> Result<()> {
    let (_temp, lock_dir, protected) = setup()?;

    let writer =
        InterProcessReaderWriterLock::acquire_writer(&lock_dir, &protected, &LockOptions::default()).await?;

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let lock_dir = lock_dir.clone();
            let protected = protected.clone();
            tokio::spawn(async move {
                InterProcessReaderWriterLock::acquire_reader(
                    &lock_dir,
                    &protected,
                    &LockOptions::new(Duration::from_secs(5)),
                )
                .await
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(readers.iter().all(|reader| !reader.is_finished()));
    drop(writer);

    let mut held = Vec::new();
    for reader in readers {
        held.push(reader.await??);
    }
    assert!(held.iter().all(InterProcessReaderWriterLock::is_held));
    Ok(())
}

#[tokio::test]
async fn test_distinct_paths_do_not_contend() -> Result<()> {
    let (temp, lock_dir, protected) = setup()?;
    let other = temp.path().join("git").join("samples-9f8e7d6c");

    let first =
        InterProcessReaderWriterLock::acquire_writer(&lock_dir, &protected, &LockOptions::new(Duration::ZERO))
            .await?;
    let second =
        InterProcessReaderWriterLock::acquire_writer(&lock_dir, &other, &LockOptions::new(Duration::ZERO)).await?;

    assert_ne!(first.lock_path(), second.lock_path());
    Ok(())
}

#[tokio::test]
async fn test_cancellation_interrupts_wait() -> Result<()> {
    let (_temp, lock_dir, protected) = setup()?;
    let _writer =
        InterProcessReaderWriterLock::acquire_writer(&lock_dir, &protected, &LockOptions::default()).await?;

    let cancel = CancellationToken::new();
    let options = LockOptions::new(Duration::from_secs(60)).with_cancellation(cancel.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let result = InterProcessReaderWriterLock::acquire_reader(&lock_dir, &protected, &options).await;
    canceller.await?;

    assert!(matches!(result, Err(RestoreError::LockCancelled { .. })));
    assert!(started.elapsed() < Duration::from_secs(10));
    Ok(())
}

#[tokio::test]
async fn test_cleanup_keeps_held_and_removes_released() -> Result<()> {
    let (temp, lock_dir, protected) = setup()?;
    let other = temp.path().join("git").join("samples-9f8e7d6c");

    let held = InterProcessReaderWriterLock::acquire_reader(&lock_dir, &protected, &LockOptions::default()).await?;
    let released = InterProcessReaderWriterLock::acquire_reader(&lock_dir, &other, &LockOptions::default()).await?;
    released.release()?;

    let removed = cleanup_stale_locks(&lock_dir, Duration::ZERO).await?;

    assert_eq!(removed, 1);
    assert!(held.lock_path().exists());
    assert!(!released.lock_path().exists());

    // A fresh handle recreates the file on demand
    let again = InterProcessReaderWriterLock::acquire_writer(&lock_dir, &other, &LockOptions::new(Duration::ZERO)).await?;
    assert!(again.lock_path().exists());
    Ok(())
}
