//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All repository reads and writes
//! flow through this interface. No other module should import `git2`; the
//! rest of the crate sees only the view structs exported here.
//!
//! # Responsibilities
//!
//! - Bare repository creation and opening
//! - Ref operations (resolve, list, CAS update, create)
//! - Tree and blob reads, including path lookups into nested trees
//! - Staged single-file changes sealed into commits
//! - History walks, per-commit diffs, tags and blame
//!
//! # Invariants
//!
//! - All ref updates use CAS (compare-and-swap) semantics
//! - No other module calls git2 directly
//! - All operations return strong types (Oid, BranchName, RefName)
//!
//! # Example
//!
//! ```ignore
//! use gitapi::git::{Git, Identity};
//! use gitapi::core::types::{BranchName, RefName};
//!
//! let git = Git::open_bare(path)?;
//! let branch = BranchName::new("master")?;
//! let head = git.branch_head(&branch)?;
//!
//! let mut staged = git.stage(head.as_ref())?;
//! staged.upsert("README.md", b"# Hello\n")?;
//! let commit = staged.seal("Add README", &Identity::new("Ann", "ann@example.com"))?;
//!
//! // CAS update (fails if the branch moved since `head` was read)
//! git.update_ref_cas(&RefName::for_branch(&branch), &commit, head.as_ref(), "gitapi: commit")?;
//! ```

mod interface;
mod staging;

pub use interface::{
    BlameHunkInfo, BlobData, BranchEntry, CommitInfo, DiffEntry, DiffStatus, Git, GitError,
    Identity, PathObject, RefEntry, SignatureInfo, TagInfo, TreeEntryInfo, TreeListing,
    WalkOrder, EMPTY_TREE_OID,
};
pub use staging::StagedIndex;
