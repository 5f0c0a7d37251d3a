//! git::staging
//!
//! Transient index for a single file change.
//!
//! # Lifecycle
//!
//! 1. **Seed** from a commit's tree (or empty) with [`Git::stage`](super::Git::stage)
//! 2. **Apply** one mutation with [`StagedIndex::upsert`] or [`StagedIndex::remove`]
//! 3. **Seal** into a tree and commit with [`StagedIndex::seal`]
//!
//! The index lives only in memory. Sealing writes objects but never moves a
//! ref; advancing the branch is a separate CAS step.
//!
//! # Invariants
//!
//! - The sealed commit's only parent is the seed commit (none when unseeded)
//! - Author and committer are the same identity at the same instant

use std::path::Path;

use super::interface::{GitError, Identity};
use crate::core::types::Oid;

const MODE_BLOB: u32 = 0o100644;
const MODE_BLOB_EXECUTABLE: u32 = 0o100755;

/// An in-memory index seeded from a commit.
pub struct StagedIndex<'r> {
    repo: &'r git2::Repository,
    index: git2::Index,
    parent: Option<git2::Commit<'r>>,
}

impl std::fmt::Debug for StagedIndex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedIndex")
            .field("entries", &self.index.len())
            .field("parent", &self.parent.as_ref().map(|c| c.id()))
            .finish()
    }
}

impl<'r> StagedIndex<'r> {
    pub(super) fn seed(
        repo: &'r git2::Repository,
        parent: Option<git2::Commit<'r>>,
    ) -> Result<Self, GitError> {
        let mut index = git2::Index::new()?;
        if let Some(commit) = &parent {
            index.read_tree(&commit.tree()?)?;
        }
        Ok(Self {
            repo,
            index,
            parent,
        })
    }

    /// Whether a file exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.index.get_path(Path::new(path), 0).is_some()
    }

    /// Number of files in the index.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the index holds no files.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Add or overwrite the file at `path`.
    ///
    /// An existing executable bit is preserved.
    pub fn upsert(&mut self, path: &str, content: &[u8]) -> Result<(), GitError> {
        let blob = self.repo.blob(content)?;
        let mode = match self.index.get_path(Path::new(path), 0) {
            Some(existing) if existing.mode == MODE_BLOB_EXECUTABLE => MODE_BLOB_EXECUTABLE,
            _ => MODE_BLOB,
        };

        let entry = git2::IndexEntry {
            ctime: git2::IndexTime::new(0, 0),
            mtime: git2::IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode,
            uid: 0,
            gid: 0,
            file_size: u32::try_from(content.len()).unwrap_or(u32::MAX),
            id: blob,
            flags: 0,
            flags_extended: 0,
            path: path.as_bytes().to_vec(),
        };

        self.index
            .add(&entry)
            .map_err(|e| GitError::from_git2(e, path))
    }

    /// Remove the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`GitError::PathNotFound`] if no file exists at `path`
    pub fn remove(&mut self, path: &str) -> Result<(), GitError> {
        if !self.contains(path) {
            return Err(GitError::PathNotFound {
                path: path.to_string(),
            });
        }
        self.index
            .remove_path(Path::new(path))
            .map_err(|e| GitError::from_git2(e, path))
    }

    /// Write the tree and a commit on top of the seed.
    ///
    /// Returns the new commit id. No ref is updated.
    pub fn seal(mut self, message: &str, author: &Identity) -> Result<Oid, GitError> {
        let tree_id = self.index.write_tree_to(self.repo)?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = author.signature_now()?;

        let parents: Vec<&git2::Commit<'_>> = self.parent.iter().collect();
        let oid = self
            .repo
            .commit(None, &signature, &signature, message, &tree, &parents)?;

        Ok(Oid::new(oid.to_string())?)
    }
}
