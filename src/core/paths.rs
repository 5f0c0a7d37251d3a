//! core::paths
//!
//! Centralized path routing for gateway storage locations.
//!
//! # Architecture
//!
//! All filesystem locations the gateway touches are computed here, from the
//! configured storage root. No other module joins repository names onto the
//! root or builds lock paths by hand.
//!
//! # Storage Layout
//!
//! ```text
//! <storage_root>/
//! └── <name>.git/                  bare repository
//!     ├── hooks/
//!     └── gitapi/
//!         └── locks/heads/<branch>.lock
//! ```
//!
//! # Example
//!
//! ```
//! use gitapi::core::paths::StoragePaths;
//! use gitapi::core::types::{BranchName, RepoName};
//! use std::path::PathBuf;
//!
//! let paths = StoragePaths::new(PathBuf::from("/srv/git"));
//! let repo = RepoName::new("site.git").unwrap();
//! let branch = BranchName::new("feature/a").unwrap();
//!
//! assert_eq!(paths.repo_path(&repo), PathBuf::from("/srv/git/site.git"));
//! assert_eq!(
//!     StoragePaths::branch_lock_path(&paths.repo_path(&repo), &branch),
//!     PathBuf::from("/srv/git/site.git/gitapi/locks/heads/feature/a.lock")
//! );
//! ```

use std::path::{Path, PathBuf};

use crate::core::types::{BranchName, RepoName};

/// Path routing rooted at the storage directory.
///
/// # Invariants
///
/// - Every repository path is `root/<name>` where `<name>` is a validated
///   [`RepoName`], so it never leaves the root
/// - Gateway bookkeeping lives under `<repo>/gitapi/`, never in `refs/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    /// Create path routing for a storage root.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the repository with this exact name.
    pub fn repo_path(&self, name: &RepoName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Gateway bookkeeping directory inside a repository.
    pub fn gateway_dir(repo_path: &Path) -> PathBuf {
        repo_path.join("gitapi")
    }

    /// Lock file guarding writes to one branch.
    ///
    /// Branch names containing `/` map onto nested directories, which keeps
    /// `a` and `a/b` on distinct lock files.
    pub fn branch_lock_path(repo_path: &Path, branch: &BranchName) -> PathBuf {
        Self::gateway_dir(repo_path)
            .join("locks")
            .join("heads")
            .join(format!("{}.lock", branch.as_str()))
    }

    /// Hooks directory of a bare repository.
    pub fn hooks_dir(repo_path: &Path) -> PathBuf {
        repo_path.join("hooks")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_path_joins_root() {
        let paths = StoragePaths::new(PathBuf::from("/data"));
        let name = RepoName::new("r.git").unwrap();
        assert_eq!(paths.repo_path(&name), PathBuf::from("/data/r.git"));
        assert_eq!(paths.root(), Path::new("/data"));
    }

    #[test]
    fn nested_branch_locks_are_distinct() {
        let repo = PathBuf::from("/data/r.git");
        let a = BranchName::new("a").unwrap();
        let ab = BranchName::new("a/b").unwrap();
        assert_ne!(
            StoragePaths::branch_lock_path(&repo, &a),
            StoragePaths::branch_lock_path(&repo, &ab)
        );
        assert!(StoragePaths::branch_lock_path(&repo, &ab).starts_with(repo.join("gitapi")));
    }

    #[test]
    fn hooks_dir_inside_repo() {
        let repo = PathBuf::from("/data/r.git");
        assert_eq!(StoragePaths::hooks_dir(&repo), repo.join("hooks"));
    }
}
