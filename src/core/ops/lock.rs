//! core::ops::lock
//!
//! Exclusive per-branch write lock.
//!
//! # Architecture
//!
//! Every file write runs seed → stage → commit → ref update. Two writers on
//! the same branch interleaving that sequence would both claim the same
//! parent and one ref update would silently drop the other commit. The
//! branch lock makes that sequence single-writer per branch.
//!
//! The lock is **branch-scoped**: writes to different branches (or different
//! repositories) never contend. It uses OS-level file locks via `fs2`, so it
//! holds across threads (each acquisition opens its own file description)
//! and across processes sharing the same storage root.
//!
//! # Storage
//!
//! - `<repo>/gitapi/locks/heads/<branch>.lock`
//!
//! # Invariants
//!
//! - Lock is held from index seeding until the ref update finishes
//! - Lock is released on drop (RAII pattern)
//! - Acquisition never waits longer than the configured timeout
//!
//! # Example
//!
//! ```ignore
//! use gitapi::core::ops::lock::BranchLock;
//! use std::time::Duration;
//!
//! let lock = BranchLock::acquire(repo_path, &branch, Duration::from_secs(5))?;
//! // seed, stage, commit, update ref
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::StoragePaths;
use crate::core::types::BranchName;

/// Interval between acquisition attempts while another writer holds the lock.
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another writer still held the lock when the timeout expired.
    #[error("branch '{branch}' is locked by another writer")]
    Timeout {
        /// The contended branch
        branch: String,
    },

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on one branch of one repository.
///
/// The lock is automatically released when this guard is dropped.
#[derive(Debug)]
pub struct BranchLock {
    path: PathBuf,
    /// When this is Some, we hold the lock.
    file: Option<File>,
}

impl BranchLock {
    /// Acquire the lock for `branch`, waiting up to `timeout`.
    ///
    /// # Errors
    ///
    /// - [`LockError::Timeout`] if another writer holds the lock for longer
    ///   than `timeout`
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock call fails
    pub fn acquire(
        repo_path: &Path,
        branch: &BranchName,
        timeout: Duration,
    ) -> Result<Self, LockError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(lock) = Self::try_acquire(repo_path, branch)? {
                return Ok(lock);
            }
            if Instant::now() >= deadline {
                return Err(LockError::Timeout {
                    branch: branch.to_string(),
                });
            }
            thread::sleep(RETRY_INTERVAL);
        }
    }

    /// Try to acquire the lock once, returning None if it is already held.
    pub fn try_acquire(repo_path: &Path, branch: &BranchName) -> Result<Option<Self>, LockError> {
        let path = StoragePaths::branch_lock_path(repo_path, branch);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LockError::CreateFailed(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(Self {
                path,
                file: Some(file),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            FileExt::unlock(&file).map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for BranchLock {
    fn drop(&mut self) {
        // Best-effort release on drop - ignore errors since we're dropping
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    #[test]
    fn acquire_creates_lock_file() {
        let temp = TempDir::new().expect("create temp dir");
        let lock = BranchLock::acquire(temp.path(), &branch("master"), Duration::from_millis(50))
            .expect("acquire lock");
        assert!(lock.is_held());
        assert!(lock.path().exists());
        assert_eq!(
            lock.path(),
            StoragePaths::branch_lock_path(temp.path(), &branch("master"))
        );
    }

    #[test]
    fn second_acquire_times_out() {
        let temp = TempDir::new().unwrap();
        let _held = BranchLock::acquire(temp.path(), &branch("master"), Duration::ZERO).unwrap();

        let result = BranchLock::acquire(temp.path(), &branch("master"), Duration::from_millis(30));
        assert!(matches!(result, Err(LockError::Timeout { .. })));
    }

    #[test]
    fn different_branches_do_not_contend() {
        let temp = TempDir::new().unwrap();
        let _a = BranchLock::acquire(temp.path(), &branch("a"), Duration::ZERO).unwrap();
        let b = BranchLock::acquire(temp.path(), &branch("a/b"), Duration::ZERO).unwrap();
        assert!(b.is_held());
    }

    #[test]
    fn released_on_drop() {
        let temp = TempDir::new().unwrap();
        {
            let lock = BranchLock::acquire(temp.path(), &branch("x"), Duration::ZERO).unwrap();
            assert!(lock.is_held());
        }
        let again = BranchLock::try_acquire(temp.path(), &branch("x")).unwrap();
        assert!(again.is_some());
    }

    #[test]
    fn explicit_release_is_repeatable() {
        let temp = TempDir::new().unwrap();
        let mut lock = BranchLock::acquire(temp.path(), &branch("x"), Duration::ZERO).unwrap();
        lock.release().expect("first release");
        lock.release().expect("second release should be ok");
        assert!(!lock.is_held());
        assert!(BranchLock::try_acquire(temp.path(), &branch("x"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn waiter_gets_lock_after_holder_drops() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().to_path_buf();
        let held = BranchLock::acquire(&repo, &branch("m"), Duration::ZERO).unwrap();

        let waiter = {
            let repo = repo.clone();
            std::thread::spawn(move || {
                BranchLock::acquire(&repo, &branch("m"), Duration::from_secs(5)).map(|l| l.is_held())
            })
        };
        std::thread::sleep(Duration::from_millis(30));
        drop(held);

        assert!(waiter.join().unwrap().unwrap());
    }

    #[test]
    fn error_display_formatting() {
        let err = LockError::Timeout {
            branch: "master".into(),
        };
        assert!(err.to_string().contains("master"));
        assert!(LockError::CreateFailed("x".into()).to_string().contains("create"));
        assert!(LockError::AcquireFailed("x".into()).to_string().contains("acquire"));
        assert!(LockError::ReleaseFailed("x".into()).to_string().contains("release"));
    }
}
