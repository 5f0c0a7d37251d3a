//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to the object store. All
//! repository reads and writes flow through this interface, which returns
//! plain view structs and normalizes errors into typed failure categories.
//!
//! # Architecture
//!
//! The `Git` struct is the only way to interact with a repository. No other
//! module imports `git2`. This ensures:
//!
//! - Consistent error handling across all Git operations
//! - Strong type guarantees at the boundary ([`Oid`], [`RefName`], [`BranchName`])
//! - CAS (compare-and-swap) semantics for all ref mutations
//!
//! Repositories are always bare. A `Git` handle is opened per operation and
//! dropped afterwards; nothing is cached between requests.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Path is missing or not a repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::ObjectNotFound`] / [`GitError::PathNotFound`]: Lookup missed
//! - [`GitError::CasFailed`]: Compare-and-swap precondition failed
//!
//! # Example
//!
//! ```ignore
//! use gitapi::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open_bare(Path::new("/srv/git/site.git"))?;
//! let listing = git.tree_at("master")?;
//! println!("{} entries in {}", listing.entries.len(), listing.oid.short(7));
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Offset, Utc};
use thiserror::Error;

use crate::content::to_display_text;
use crate::core::types::{BranchName, ObjectKind, Oid, RefName, TypeError};

use super::staging::StagedIndex;

/// Hash of the tree with no entries.
pub const EMPTY_TREE_OID: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Errors from Git operations.
///
/// The categorization lets the gateway map each failure to a client or
/// server error without inspecting messages.
#[derive(Debug, Error)]
pub enum GitError {
    /// Path is missing or does not hold a repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// Something with this name already exists.
    #[error("already exists: {what}")]
    AlreadyExists {
        /// What collided (path, tag or ref)
        what: String,
    },

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Compare-and-swap precondition failed.
    ///
    /// The ref moved between the moment a write read it and the moment the
    /// write tried to advance it.
    #[error("CAS failed for {refname}: expected {expected}, found {actual}")]
    CasFailed {
        /// The ref being updated
        refname: String,
        /// The expected old value
        expected: String,
        /// The actual current value
        actual: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID (or revision) that was not found
        oid: String,
    },

    /// No entry at a path inside a tree.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that was looked up
        path: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// Input git refuses to store (bad signature, bad tag name).
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the problem
        message: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    ///
    /// `context` is the ref, object id or revision being worked on.
    pub(crate) fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context == "HEAD" {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::Exists => GitError::AlreadyExists {
                what: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            _ => match err.class() {
                git2::ErrorClass::Os | git2::ErrorClass::Filesystem => GitError::AccessError {
                    message: format!("{}: {}", context, err.message()),
                },
                _ => GitError::Internal {
                    message: format!("{}: {}", context, err.message()),
                },
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                oid: err.message().to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: err.message().to_string(),
            },
            _ => GitError::Internal {
                message: err.message().to_string(),
            },
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidRefName(msg) | TypeError::InvalidBranchName(msg) => {
                GitError::InvalidRefName { message: msg }
            }
            TypeError::InvalidRepoName(msg) | TypeError::InvalidObjectKind(msg) => {
                GitError::InvalidInput { message: msg }
            }
        }
    }
}

// =============================================================================
// Views
// =============================================================================

/// Name and email of a person writing to the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    /// Create an identity.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Signature stamped with the current time.
    pub(crate) fn signature_now(&self) -> Result<git2::Signature<'static>, GitError> {
        git2::Signature::now(&self.name, &self.email).map_err(|e| GitError::InvalidInput {
            message: format!("invalid signature: {}", e.message()),
        })
    }
}

/// A signature read back from a commit or tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub name: String,
    pub email: String,
    /// Timestamp in the signer's own UTC offset
    pub time: DateTime<FixedOffset>,
}

/// One entry of a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntryInfo {
    pub name: String,
    pub oid: Oid,
    pub kind: ObjectKind,
}

/// A tree and its immediate entries, in git's name order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeListing {
    pub oid: Oid,
    pub entries: Vec<TreeEntryInfo>,
}

/// Raw blob bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobData {
    pub oid: Oid,
    /// Entry name when the blob was reached through a tree
    pub name: Option<String>,
    pub content: Vec<u8>,
}

/// The object found at a path inside a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathObject {
    Tree(TreeListing),
    Blob(BlobData),
}

/// A local branch and its head commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchEntry {
    pub name: BranchName,
    pub oid: Oid,
}

/// A ref entry with its direct target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEntry {
    /// The full ref name
    pub name: RefName,
    /// The object the ref points to (not peeled)
    pub oid: Oid,
    /// Kind of the target object
    pub kind: ObjectKind,
}

/// Information about a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// Parent OIDs, first parent first
    pub parents: Vec<Oid>,
    /// Root tree
    pub tree: Oid,
    /// Full commit message, normalized to UTF-8
    pub message: String,
    pub author: SignatureInfo,
    pub committer: SignatureInfo,
}

/// How a path changed between a commit and its first parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
    TypeChanged,
}

/// One file-level change of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    /// Octal mode string, `None` when the side does not exist
    pub old_mode: Option<String>,
    pub new_mode: Option<String>,
    pub status: DiffStatus,
    /// Percentage of unchanged lines for renames and copies, else 0
    pub similarity: u32,
    /// Unified patch text
    pub patch: Vec<u8>,
    /// Blob contents on each side, for binary classification
    pub old_content: Option<Vec<u8>>,
    pub new_content: Option<Vec<u8>>,
}

/// An annotated or lightweight tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    /// Short tag name
    pub name: String,
    /// What `refs/tags/<name>` points to (the tag object if annotated)
    pub ref_target: Oid,
    /// The tagged object
    pub object: Oid,
    pub object_kind: ObjectKind,
    /// `None` for lightweight tags
    pub message: Option<String>,
    /// `None` for lightweight tags
    pub tagger: Option<SignatureInfo>,
}

/// A run of consecutive lines last changed by the same commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameHunkInfo {
    pub commit: Oid,
    /// 1-based line number in the blamed file
    pub start_line: usize,
    pub line_count: usize,
    pub author: SignatureInfo,
    /// Raw bytes of each line, without line terminators
    pub lines: Vec<Vec<u8>>,
}

/// History traversal order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WalkOrder {
    /// Root commit first
    #[default]
    OldestFirst,
    /// Start commit first
    NewestFirst,
}

// =============================================================================
// Conversions
// =============================================================================

fn to_git2_oid(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

fn from_git2_oid(oid: git2::Oid) -> Result<Oid, GitError> {
    Ok(Oid::new(oid.to_string())?)
}

fn object_kind(kind: Option<git2::ObjectType>) -> Option<ObjectKind> {
    match kind? {
        git2::ObjectType::Blob => Some(ObjectKind::Blob),
        git2::ObjectType::Tree => Some(ObjectKind::Tree),
        git2::ObjectType::Commit => Some(ObjectKind::Commit),
        git2::ObjectType::Tag => Some(ObjectKind::Tag),
        _ => None,
    }
}

fn git2_kind(kind: ObjectKind) -> git2::ObjectType {
    match kind {
        ObjectKind::Blob => git2::ObjectType::Blob,
        ObjectKind::Tree => git2::ObjectType::Tree,
        ObjectKind::Commit => git2::ObjectType::Commit,
        ObjectKind::Tag => git2::ObjectType::Tag,
    }
}

fn signature_info(sig: &git2::Signature<'_>) -> SignatureInfo {
    let when = sig.when();
    let offset = FixedOffset::east_opt(when.offset_minutes() * 60).unwrap_or_else(|| Utc.fix());
    let time = DateTime::from_timestamp(when.seconds(), 0)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .with_timezone(&offset);

    SignatureInfo {
        name: to_display_text(sig.name_bytes()),
        email: to_display_text(sig.email_bytes()),
        time,
    }
}

fn file_mode(mode: git2::FileMode) -> Option<String> {
    let bits: u32 = match mode {
        git2::FileMode::Tree => 0o040000,
        git2::FileMode::Blob => 0o100644,
        git2::FileMode::BlobExecutable => 0o100755,
        git2::FileMode::Link => 0o120000,
        git2::FileMode::Commit => 0o160000,
        _ => return None,
    };
    Some(format!("{bits:06o}"))
}

fn split_lines(content: &[u8]) -> Vec<Vec<u8>> {
    if content.is_empty() {
        return Vec::new();
    }
    let body = content.strip_suffix(b"\n").unwrap_or(content);
    body.split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line).to_vec())
        .collect()
}

/// Normalize a slash-delimited path for tree lookups.
fn tree_path(path: &str) -> &str {
    path.trim_matches('/')
}

/// The Git interface.
///
/// This is the **single point of interaction** with a bare repository. All
/// reads and writes flow through this interface. No other module should
/// import `git2` directly.
///
/// # CAS Semantics
///
/// Ref mutations use compare-and-swap: an update only succeeds if the ref's
/// current value matches the value the caller observed. Objects written
/// before a failed update are unreachable and harmless.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
    /// Path the repository was opened at
    path: PathBuf,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git").field("path", &self.path).finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Creation
    // =========================================================================

    /// Open the bare repository at exactly `path`.
    ///
    /// No discovery is done: parent directories are never searched.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if the path is missing or not a repository
    pub fn open_bare(path: &Path) -> Result<Self, GitError> {
        if !path.is_dir() {
            return Err(GitError::NotARepo {
                path: path.to_path_buf(),
            });
        }
        let repo = git2::Repository::open_bare(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        Ok(Self {
            repo,
            path: path.to_path_buf(),
        })
    }

    /// Initialize a new bare repository whose `HEAD` names `head`.
    ///
    /// # Errors
    ///
    /// - [`GitError::AlreadyExists`] if anything exists at `path`
    /// - [`GitError::AccessError`] on filesystem failure
    pub fn init_bare(path: &Path, head: &BranchName) -> Result<Self, GitError> {
        if path.exists() {
            return Err(GitError::AlreadyExists {
                what: path.display().to_string(),
            });
        }

        let repo = git2::Repository::init_bare(path).map_err(|e| GitError::AccessError {
            message: format!("cannot initialize {}: {}", path.display(), e.message()),
        })?;

        let head_ref = RefName::for_branch(head);
        repo.set_head(head_ref.as_str())
            .map_err(|e| GitError::from_git2(e, head_ref.as_str()))?;

        Ok(Self {
            repo,
            path: path.to_path_buf(),
        })
    }

    /// Path the repository was opened at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Ref Resolution
    // =========================================================================

    /// Resolve a ref to the commit it (eventually) points at.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if the ref doesn't exist
    pub fn resolve_ref(&self, refname: &str) -> Result<Oid, GitError> {
        let reference = self
            .repo
            .find_reference(refname)
            .map_err(|e| GitError::from_git2(e, refname))?;

        let oid = reference
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, refname))?
            .id();

        from_git2_oid(oid)
    }

    /// Resolve a ref, returning None if it doesn't exist.
    pub fn try_resolve_ref(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.resolve_ref(refname) {
            Ok(oid) => Ok(Some(oid)),
            Err(GitError::RefNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Head commit of a branch, or None if the branch has no commits.
    pub fn branch_head(&self, branch: &BranchName) -> Result<Option<Oid>, GitError> {
        self.try_resolve_ref(RefName::for_branch(branch).as_str())
    }

    /// The commit a branch or revision spec names, None when it names none.
    pub fn resolve_commit(&self, spec: &str) -> Result<Option<Oid>, GitError> {
        match self.revparse_commit(spec)? {
            Some(commit) => Ok(Some(from_git2_oid(commit.id())?)),
            None => Ok(None),
        }
    }

    /// Resolve a revision spec to an object, None when it names nothing.
    ///
    /// An existing `refs/heads/<spec>` wins over any other ref of that short
    /// name, so a tag never shadows the branch writes land on.
    fn revparse(&self, spec: &str) -> Result<Option<git2::Object<'_>>, GitError> {
        if let Ok(branch) = BranchName::new(spec) {
            let refname = RefName::for_branch(&branch);
            match self.repo.find_reference(refname.as_str()) {
                Ok(reference) => {
                    return match reference.peel(git2::ObjectType::Commit) {
                        Ok(object) => Ok(Some(object)),
                        Err(e) => Err(GitError::from_git2(e, refname.as_str())),
                    };
                }
                Err(e)
                    if matches!(
                        e.code(),
                        git2::ErrorCode::NotFound | git2::ErrorCode::InvalidSpec
                    ) => {}
                Err(e) => return Err(GitError::from_git2(e, refname.as_str())),
            }
        }

        match self.repo.revparse_single(spec) {
            Ok(object) => Ok(Some(object)),
            Err(e)
                if matches!(
                    e.code(),
                    git2::ErrorCode::NotFound
                        | git2::ErrorCode::InvalidSpec
                        | git2::ErrorCode::UnbornBranch
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(GitError::from_git2(e, spec)),
        }
    }

    fn revparse_commit(&self, spec: &str) -> Result<Option<git2::Commit<'_>>, GitError> {
        match self.revparse(spec)? {
            Some(object) => match object.peel_to_commit() {
                Ok(commit) => Ok(Some(commit)),
                Err(_) => Ok(None),
            },
            None => Ok(None),
        }
    }

    // =========================================================================
    // Ref Enumeration
    // =========================================================================

    /// List all local branches with their head commits.
    pub fn list_branches(&self) -> Result<Vec<BranchEntry>, GitError> {
        let branches = self
            .repo
            .branches(Some(git2::BranchType::Local))
            .map_err(|e| GitError::from_git2(e, "refs/heads/"))?;

        let mut entries = Vec::new();
        for branch in branches {
            let (branch, _) = branch?;
            let Some(name) = branch.name().ok().flatten() else {
                continue; // Skip non-UTF8 names
            };
            let Ok(name) = BranchName::new(name) else {
                continue;
            };
            let Ok(commit) = branch.get().peel_to_commit() else {
                continue;
            };
            entries.push(BranchEntry {
                name,
                oid: from_git2_oid(commit.id())?,
            });
        }

        Ok(entries)
    }

    /// List every ref under `refs/` with its direct target and kind.
    ///
    /// Symbolic refs are followed to their final target.
    pub fn list_refs(&self) -> Result<Vec<RefEntry>, GitError> {
        let refs = self.repo.references()?;

        let mut entries = Vec::new();
        for reference in refs {
            let reference = reference?;
            let Some(name) = reference.name() else {
                continue;
            };
            let Ok(name) = RefName::new(name) else {
                continue;
            };
            if let Some(entry) = self.ref_entry(name, &reference)? {
                entries.push(entry);
            }
        }

        entries.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        Ok(entries)
    }

    /// Look up one ref by full name.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if the ref doesn't exist or is dangling
    pub fn find_ref(&self, refname: &RefName) -> Result<RefEntry, GitError> {
        let reference = self
            .repo
            .find_reference(refname.as_str())
            .map_err(|e| GitError::from_git2(e, refname.as_str()))?;

        self.ref_entry(refname.clone(), &reference)?
            .ok_or_else(|| GitError::RefNotFound {
                refname: refname.to_string(),
            })
    }

    fn ref_entry(
        &self,
        name: RefName,
        reference: &git2::Reference<'_>,
    ) -> Result<Option<RefEntry>, GitError> {
        let Ok(resolved) = reference.resolve() else {
            return Ok(None); // Dangling symbolic ref
        };
        let Some(target) = resolved.target() else {
            return Ok(None);
        };
        let kind = match self.repo.find_object(target, None) {
            Ok(object) => object_kind(object.kind()),
            Err(_) => None,
        };
        let Some(kind) = kind else {
            return Ok(None);
        };

        Ok(Some(RefEntry {
            name,
            oid: from_git2_oid(target)?,
            kind,
        }))
    }

    // =========================================================================
    // CAS Ref Operations
    // =========================================================================

    /// Update a ref with compare-and-swap semantics.
    ///
    /// The update only succeeds if the ref's current value matches
    /// `expected_old`. If `expected_old` is `None`, the ref must not exist
    /// (create case). The check and the write happen under libgit2's ref
    /// lock, so a concurrent writer cannot slip in between.
    ///
    /// # Errors
    ///
    /// - [`GitError::CasFailed`] if the current value doesn't match expected
    pub fn update_ref_cas(
        &self,
        refname: &RefName,
        new_oid: &Oid,
        expected_old: Option<&Oid>,
        message: &str,
    ) -> Result<(), GitError> {
        let new = to_git2_oid(new_oid)?;

        let result = match expected_old {
            Some(expected) => self.repo.reference_matching(
                refname.as_str(),
                new,
                true,
                to_git2_oid(expected)?,
                message,
            ),
            None => self.repo.reference(refname.as_str(), new, false, message),
        };

        match result {
            Ok(_) => Ok(()),
            Err(e)
                if matches!(
                    e.code(),
                    git2::ErrorCode::Modified
                        | git2::ErrorCode::Exists
                        | git2::ErrorCode::NotFound
                        | git2::ErrorCode::Locked
                ) =>
            {
                let actual = self.try_resolve_ref_raw(refname.as_str())?;
                Err(GitError::CasFailed {
                    refname: refname.to_string(),
                    expected: expected_old
                        .map(|o| o.to_string())
                        .unwrap_or_else(|| "<none>".to_string()),
                    actual: actual.unwrap_or_else(|| "<none>".to_string()),
                })
            }
            Err(e) => Err(GitError::from_git2(e, refname.as_str())),
        }
    }

    /// Whether moving a ref from `old` to `new` is a fast-forward.
    ///
    /// Only commits fast-forward; any other object kind on either side
    /// answers `false`.
    pub fn is_fast_forward(&self, old: &Oid, new: &Oid) -> Result<bool, GitError> {
        if old == new {
            return Ok(true);
        }
        let (old, new) = (to_git2_oid(old)?, to_git2_oid(new)?);
        let is_commit = |oid| {
            matches!(
                self.repo.find_object(oid, None).map(|o| o.kind()),
                Ok(Some(git2::ObjectType::Commit))
            )
        };
        if !is_commit(old) || !is_commit(new) {
            return Ok(false);
        }
        Ok(self.repo.graph_descendant_of(new, old)?)
    }

    /// Create a ref that must not exist yet, pointing at an existing object.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if `target` is not in the object store
    /// - [`GitError::CasFailed`] if the ref already exists
    pub fn create_ref(
        &self,
        refname: &RefName,
        target: &Oid,
        message: &str,
    ) -> Result<RefEntry, GitError> {
        let object = self
            .repo
            .find_object(to_git2_oid(target)?, None)
            .map_err(|e| GitError::from_git2(e, target.as_str()))?;
        let kind = object_kind(object.kind()).ok_or_else(|| GitError::ObjectNotFound {
            oid: target.to_string(),
        })?;

        self.update_ref_cas(refname, target, None, message)?;

        Ok(RefEntry {
            name: refname.clone(),
            oid: target.clone(),
            kind,
        })
    }

    /// Try to resolve a ref to its raw OID string (without peeling).
    fn try_resolve_ref_raw(&self, refname: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => {
                let resolved = reference.resolve().unwrap_or(reference);
                Ok(resolved.target().map(|oid| oid.to_string()))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    // =========================================================================
    // Trees and Blobs
    // =========================================================================

    fn listing(&self, tree: &git2::Tree<'_>) -> Result<TreeListing, GitError> {
        let mut entries = Vec::with_capacity(tree.len());
        for entry in tree.iter() {
            let Some(kind) = object_kind(entry.kind()) else {
                continue;
            };
            entries.push(TreeEntryInfo {
                name: to_display_text(entry.name_bytes()),
                oid: from_git2_oid(entry.id())?,
                kind,
            });
        }

        Ok(TreeListing {
            oid: from_git2_oid(tree.id())?,
            entries,
        })
    }

    fn empty_listing() -> Result<TreeListing, GitError> {
        Ok(TreeListing {
            oid: Oid::new(EMPTY_TREE_OID)?,
            entries: Vec::new(),
        })
    }

    fn root_tree(&self, spec: &str) -> Result<Option<git2::Tree<'_>>, GitError> {
        match self.revparse(spec)? {
            Some(object) => match object.peel_to_tree() {
                Ok(tree) => Ok(Some(tree)),
                Err(_) => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// Root tree listing of a branch or revision.
    ///
    /// A spec that names nothing (unknown or unborn branch) yields the empty
    /// tree rather than an error.
    pub fn tree_at(&self, spec: &str) -> Result<TreeListing, GitError> {
        match self.root_tree(spec)? {
            Some(tree) => self.listing(&tree),
            None => Self::empty_listing(),
        }
    }

    /// The tree or blob at `path` inside the tree of `spec`.
    ///
    /// An empty path names the root tree.
    ///
    /// # Errors
    ///
    /// - [`GitError::PathNotFound`] if any path segment is missing
    pub fn object_at(&self, spec: &str, path: &str) -> Result<PathObject, GitError> {
        let path = tree_path(path);
        let root = self.root_tree(spec)?;

        if path.is_empty() {
            return match root {
                Some(tree) => Ok(PathObject::Tree(self.listing(&tree)?)),
                None => Ok(PathObject::Tree(Self::empty_listing()?)),
            };
        }

        let not_found = || GitError::PathNotFound {
            path: path.to_string(),
        };
        let root = root.ok_or_else(not_found)?;
        let entry = root.get_path(Path::new(path)).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound => not_found(),
            _ => GitError::from_git2(e, path),
        })?;
        let name = to_display_text(entry.name_bytes());

        let object = entry.to_object(&self.repo).map_err(|_| not_found())?;
        match object.kind() {
            Some(git2::ObjectType::Tree) => {
                let tree = object.peel_to_tree()?;
                Ok(PathObject::Tree(self.listing(&tree)?))
            }
            Some(git2::ObjectType::Blob) => {
                let blob = object.peel_to_blob()?;
                Ok(PathObject::Blob(BlobData {
                    oid: from_git2_oid(blob.id())?,
                    name: Some(name),
                    content: blob.content().to_vec(),
                }))
            }
            _ => Err(not_found()),
        }
    }

    /// Read a blob by OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if no blob has this id
    pub fn read_blob(&self, oid: &Oid) -> Result<BlobData, GitError> {
        let blob = self
            .repo
            .find_blob(to_git2_oid(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        Ok(BlobData {
            oid: oid.clone(),
            name: None,
            content: blob.content().to_vec(),
        })
    }

    /// Kind of a stored object.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if no object has this id
    pub fn kind_of(&self, oid: &Oid) -> Result<ObjectKind, GitError> {
        let object = self
            .repo
            .find_object(to_git2_oid(oid)?, None)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        object_kind(object.kind()).ok_or_else(|| GitError::ObjectNotFound {
            oid: oid.to_string(),
        })
    }

    /// Listing of a tree by OID; a commit id lists the commit's root tree.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the id names no tree or commit
    pub fn read_tree(&self, oid: &Oid) -> Result<TreeListing, GitError> {
        let not_found = || GitError::ObjectNotFound {
            oid: oid.to_string(),
        };
        let object = self
            .repo
            .find_object(to_git2_oid(oid)?, None)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        match object.kind() {
            Some(git2::ObjectType::Tree | git2::ObjectType::Commit) => {
                let tree = object.peel_to_tree().map_err(|_| not_found())?;
                self.listing(&tree)
            }
            _ => Err(not_found()),
        }
    }

    // =========================================================================
    // Staging
    // =========================================================================

    /// Start a staged change seeded from `seed`'s tree.
    ///
    /// The seed commit becomes the parent of the sealed commit; `None` seeds
    /// an empty index and produces a root commit.
    pub fn stage(&self, seed: Option<&Oid>) -> Result<StagedIndex<'_>, GitError> {
        let parent = match seed {
            Some(oid) => Some(
                self.repo
                    .find_commit(to_git2_oid(oid)?)
                    .map_err(|e| GitError::from_git2(e, oid.as_str()))?,
            ),
            None => None,
        };
        StagedIndex::seed(&self.repo, parent)
    }

    // =========================================================================
    // Commits
    // =========================================================================

    fn find_commit(&self, oid: &Oid) -> Result<git2::Commit<'_>, GitError> {
        self.repo
            .find_commit(to_git2_oid(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    fn commit_view(commit: &git2::Commit<'_>) -> Result<CommitInfo, GitError> {
        let parents = commit
            .parent_ids()
            .map(from_git2_oid)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CommitInfo {
            oid: from_git2_oid(commit.id())?,
            parents,
            tree: from_git2_oid(commit.tree_id())?,
            message: to_display_text(commit.message_bytes()),
            author: signature_info(&commit.author()),
            committer: signature_info(&commit.committer()),
        })
    }

    /// Get information about a commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if no commit has this id
    pub fn commit_info(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        Self::commit_view(&self.find_commit(oid)?)
    }

    /// Walk history reachable from `start`.
    ///
    /// A start that names nothing (unborn `HEAD`, unknown branch) yields an
    /// empty history.
    pub fn walk_commits(&self, start: &str, order: WalkOrder) -> Result<Vec<CommitInfo>, GitError> {
        let Some(tip) = self.revparse_commit(start)? else {
            return Ok(Vec::new());
        };

        let mut walk = self.repo.revwalk()?;
        let sorting = match order {
            WalkOrder::OldestFirst => git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE,
            WalkOrder::NewestFirst => git2::Sort::TOPOLOGICAL | git2::Sort::TIME,
        };
        walk.set_sorting(sorting)?;
        walk.push(tip.id())?;

        let mut commits = Vec::new();
        for oid in walk {
            let commit = self.repo.find_commit(oid?)?;
            commits.push(Self::commit_view(&commit)?);
        }

        Ok(commits)
    }

    /// File-level changes of a commit against its first parent.
    ///
    /// Root commits are diffed against the empty tree. Renames are detected.
    pub fn commit_diffs(&self, oid: &Oid) -> Result<Vec<DiffEntry>, GitError> {
        let commit = self.find_commit(oid)?;
        let tree = commit.tree()?;
        let parent_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0)?.tree()?)
        } else {
            None
        };

        let mut diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
        let mut find = git2::DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;

        let mut entries = Vec::new();
        for (idx, delta) in diff.deltas().enumerate() {
            let status = match delta.status() {
                git2::Delta::Added => DiffStatus::Added,
                git2::Delta::Deleted => DiffStatus::Deleted,
                git2::Delta::Renamed => DiffStatus::Renamed,
                git2::Delta::Copied => DiffStatus::Copied,
                git2::Delta::Typechange => DiffStatus::TypeChanged,
                _ => DiffStatus::Modified,
            };

            let old_content = self.side_content(&delta.old_file());
            let new_content = self.side_content(&delta.new_file());

            let (patch, changed_lines) = match git2::Patch::from_diff(&diff, idx)? {
                Some(mut patch) => {
                    let (_, additions, deletions) = patch.line_stats()?;
                    (patch.to_buf()?.to_vec(), additions.max(deletions))
                }
                None => (Vec::new(), 0),
            };

            let similarity = match status {
                DiffStatus::Renamed | DiffStatus::Copied => {
                    similarity_percent(old_content.as_deref(), new_content.as_deref(), changed_lines)
                }
                _ => 0,
            };

            entries.push(DiffEntry {
                old_path: delta.old_file().path().map(|p| p.to_string_lossy().into_owned()),
                new_path: delta.new_file().path().map(|p| p.to_string_lossy().into_owned()),
                old_mode: file_mode(delta.old_file().mode()),
                new_mode: file_mode(delta.new_file().mode()),
                status,
                similarity,
                patch,
                old_content,
                new_content,
            });
        }

        Ok(entries)
    }

    fn side_content(&self, file: &git2::DiffFile<'_>) -> Option<Vec<u8>> {
        if file.id().is_zero() {
            return None;
        }
        match file.mode() {
            git2::FileMode::Blob | git2::FileMode::BlobExecutable | git2::FileMode::Link => self
                .repo
                .find_blob(file.id())
                .ok()
                .map(|blob| blob.content().to_vec()),
            _ => None,
        }
    }

    // =========================================================================
    // Tags
    // =========================================================================

    fn annotated_tag(name: &str, tag: &git2::Tag<'_>) -> Result<Option<TagInfo>, GitError> {
        let Some(kind) = object_kind(tag.target_type()) else {
            return Ok(None);
        };
        Ok(Some(TagInfo {
            name: name.to_string(),
            ref_target: from_git2_oid(tag.id())?,
            object: from_git2_oid(tag.target_id())?,
            object_kind: kind,
            message: Some(to_display_text(tag.message_bytes().unwrap_or_default())),
            tagger: tag.tagger().map(|sig| signature_info(&sig)),
        }))
    }

    /// List all tags, annotated and lightweight, sorted by name.
    pub fn list_tags(&self) -> Result<Vec<TagInfo>, GitError> {
        let names = self.repo.tag_names(None)?;

        let mut tags = Vec::new();
        for name in names.iter().flatten() {
            let refname = format!("refs/tags/{name}");
            let Some(target) = self.try_resolve_ref_raw(&refname)? else {
                continue;
            };
            let target = git2::Oid::from_str(&target)?;

            let info = match self.repo.find_tag(target) {
                Ok(tag) => Self::annotated_tag(name, &tag)?,
                Err(_) => {
                    let kind = match self.repo.find_object(target, None) {
                        Ok(object) => object_kind(object.kind()),
                        Err(_) => None,
                    };
                    match kind {
                        Some(kind) => Some(TagInfo {
                            name: name.to_string(),
                            ref_target: from_git2_oid(target)?,
                            object: from_git2_oid(target)?,
                            object_kind: kind,
                            message: None,
                            tagger: None,
                        }),
                        None => None,
                    }
                }
            };
            tags.extend(info);
        }

        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    /// An annotated tag object by OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the id names no tag object
    pub fn read_tag(&self, oid: &Oid) -> Result<TagInfo, GitError> {
        let not_found = || GitError::ObjectNotFound {
            oid: oid.to_string(),
        };
        let tag = self
            .repo
            .find_tag(to_git2_oid(oid)?)
            .map_err(|_| not_found())?;
        let name = to_display_text(tag.name_bytes());
        Self::annotated_tag(&name, &tag)?.ok_or_else(not_found)
    }

    /// Create an annotated tag and its `refs/tags/<name>` ref.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if `target` is missing or not a `kind`
    /// - [`GitError::AlreadyExists`] if the tag already exists
    pub fn create_tag(
        &self,
        name: &str,
        target: &Oid,
        kind: ObjectKind,
        tagger: &Identity,
        message: &str,
    ) -> Result<Oid, GitError> {
        let object = self
            .repo
            .find_object(to_git2_oid(target)?, Some(git2_kind(kind)))
            .map_err(|e| GitError::from_git2(e, target.as_str()))?;
        let signature = tagger.signature_now()?;

        let oid = self
            .repo
            .tag(name, &object, &signature, message, false)
            .map_err(|e| match e.code() {
                git2::ErrorCode::Exists => GitError::AlreadyExists {
                    what: format!("tag {name}"),
                },
                git2::ErrorCode::InvalidSpec => GitError::InvalidRefName {
                    message: format!("invalid tag name '{name}'"),
                },
                _ => GitError::from_git2(e, name),
            })?;

        from_git2_oid(oid)
    }

    // =========================================================================
    // Blame
    // =========================================================================

    /// Attribute each line of `path` at `spec` to the commit that last
    /// changed it.
    ///
    /// Returns the blamed file alongside the hunks so callers can classify
    /// its content.
    ///
    /// # Errors
    ///
    /// - [`GitError::PathNotFound`] if the revision or file does not exist
    pub fn blame(&self, spec: &str, path: &str) -> Result<(BlobData, Vec<BlameHunkInfo>), GitError> {
        let path = tree_path(path);
        let not_found = || GitError::PathNotFound {
            path: path.to_string(),
        };

        let commit = self.revparse_commit(spec)?.ok_or_else(not_found)?;
        let blob = match self.object_at(&commit.id().to_string(), path)? {
            PathObject::Blob(blob) => blob,
            PathObject::Tree(_) => return Err(not_found()),
        };

        let mut opts = git2::BlameOptions::new();
        opts.newest_commit(commit.id());
        let blame = self
            .repo
            .blame_file(Path::new(path), Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, path))?;

        let lines = split_lines(&blob.content);
        let mut authors: HashMap<git2::Oid, SignatureInfo> = HashMap::new();
        let mut hunks = Vec::new();

        for hunk in blame.iter() {
            let commit_id = hunk.final_commit_id();
            let author = match authors.get(&commit_id) {
                Some(author) => author.clone(),
                None => {
                    let author = signature_info(&self.repo.find_commit(commit_id)?.author());
                    authors.insert(commit_id, author.clone());
                    author
                }
            };

            let start = hunk.final_start_line();
            let count = hunk.lines_in_hunk();
            let from = start.saturating_sub(1).min(lines.len());
            let to = (from + count).min(lines.len());

            hunks.push(BlameHunkInfo {
                commit: from_git2_oid(commit_id)?,
                start_line: start,
                line_count: count,
                author,
                lines: lines[from..to].to_vec(),
            });
        }

        Ok((blob, hunks))
    }
}

/// Percentage of lines shared by both sides of a rename or copy.
fn similarity_percent(old: Option<&[u8]>, new: Option<&[u8]>, changed_lines: usize) -> u32 {
    match (old, new) {
        (Some(old), Some(new)) if old == new => 100,
        (Some(old), Some(new)) => {
            let total = split_lines(old).len().max(split_lines(new).len());
            if total == 0 {
                return 100;
            }
            let kept = total.saturating_sub(changed_lines);
            u32::try_from(kept * 100 / total).unwrap_or(0)
        }
        _ => 0,
    }
}
