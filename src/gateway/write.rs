//! gateway::write
//!
//! Index Mutator plus branch, ref and tag writes.
//!
//! # Single-file commits
//!
//! [`Gateway::commit_file_change`] turns one create/update/delete into one
//! commit:
//!
//! 1. Take the target branch's lock
//! 2. Seed a staged index from the source branch head if given and born,
//!    else the target branch head (empty when neither has history)
//! 3. Apply the one mutation
//! 4. Seal with parent = the seeding head
//! 5. CAS the target ref from the head observed in step 2
//!
//! # Invariants
//!
//! - The ref either advances to the new commit or is left untouched
//! - A CAS mismatch or lock timeout is a [`GatewayError::WriteConflict`]

use serde::Deserialize;
use tracing::info;

use super::error::GatewayError;
use super::read::DEFAULT_START;
use super::Gateway;
use crate::content::decode_transport;
use crate::core::ops::BranchLock;
use crate::core::types::{BranchName, ObjectKind, Oid, RefName};
use crate::git::{BranchEntry, Identity};
use crate::translate::{self, CommitShaJson, HeadJson, ObjectRefJson, RefJson};

/// The one change a file write applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Create or overwrite with `content` in the given transport encoding
    Upsert {
        content: String,
        encoding: Option<String>,
    },
    Delete,
}

/// A single-file commit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Branch the commit lands on
    pub branch: String,
    /// Slash-delimited path inside the tree
    pub path: String,
    pub mutation: Mutation,
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    /// Branch whose tree and head seed the change
    pub source_branch: Option<String>,
}

/// An annotated tag request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagRequest {
    pub tag: String,
    pub message: String,
    pub sha: String,
    /// Kind of the tagged object
    #[serde(rename = "type")]
    pub kind: String,
    pub user: String,
    pub email: String,
}

/// Check a write path: relative, no empty, `.`, `..` or `.git` segments.
pub fn validate_path(path: &str) -> Result<(), GatewayError> {
    let invalid = |why: &str| GatewayError::InvalidArgument(format!("path '{path}' {why}"));

    if path.is_empty() {
        return Err(invalid("is empty"));
    }
    if path.starts_with('/') {
        return Err(invalid("must be relative"));
    }
    for segment in path.split('/') {
        match segment {
            "" => return Err(invalid("has an empty segment")),
            "." | ".." => return Err(invalid("has a relative segment")),
            s if s.eq_ignore_ascii_case(".git") => return Err(invalid("has a .git segment")),
            s if s.contains('\0') => return Err(invalid("contains a NUL byte")),
            _ => {}
        }
    }
    Ok(())
}

fn require(value: &str, what: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(())
}

impl Gateway {
    /// Commit one file change to a branch.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidArgument`] for a bad path, branch or identity
    /// - [`GatewayError::InvalidEncoding`] if content does not decode
    /// - [`GatewayError::ObjectNotFound`] when deleting a missing path
    /// - [`GatewayError::WriteConflict`] if another writer won
    pub fn commit_file_change(
        &self,
        repo: &str,
        change: FileChange,
    ) -> Result<CommitShaJson, GatewayError> {
        let git = self.open(repo)?;

        let target = BranchName::new(change.branch.as_str())?;
        let source = change
            .source_branch
            .as_deref()
            .map(BranchName::new)
            .transpose()?;
        validate_path(&change.path)?;
        require(&change.author_name, "user")?;
        require(&change.author_email, "email")?;
        require(&change.message, "message")?;
        let author = Identity::new(change.author_name, change.author_email);

        let content = match &change.mutation {
            Mutation::Upsert { content, encoding } => {
                Some(decode_transport(content, encoding.as_deref())?)
            }
            Mutation::Delete => None,
        };

        let _lock = BranchLock::acquire(git.path(), &target, self.lock_timeout)?;

        let target_head = git.branch_head(&target)?;
        // A source without history falls back to the target
        let seed_head = match &source {
            Some(source) => git.branch_head(source)?.or_else(|| target_head.clone()),
            None => target_head.clone(),
        };

        let mut staged = git.stage(seed_head.as_ref())?;
        match &content {
            Some(bytes) => staged.upsert(&change.path, bytes)?,
            None => staged.remove(&change.path)?,
        }
        let commit = staged.seal(&change.message, &author)?;

        let reflog = format!("gitapi: {}", change.message.lines().next().unwrap_or_default());
        git.update_ref_cas(
            &RefName::for_branch(&target),
            &commit,
            target_head.as_ref(),
            &reflog,
        )?;

        info!(
            repo,
            branch = %target,
            path = %change.path,
            delete = content.is_none(),
            from = source.as_ref().map(|s| s.as_str()),
            commit = %commit,
            "committed file change"
        );
        Ok(translate::commit_sha(&commit))
    }

    /// Create a ref pointing at an existing object.
    ///
    /// Short names are taken as branches (`refs/heads/<name>`).
    pub fn create_ref(&self, repo: &str, name: &str, sha: &str) -> Result<RefJson, GatewayError> {
        let git = self.open(repo)?;
        let refname = RefName::from_client(name)?;
        let target = Oid::new(sha)?;

        let entry = git.create_ref(&refname, &target, "gitapi: create ref")?;
        info!(repo, refname = %refname, sha = %target, "created ref");
        Ok(translate::reference(&entry))
    }

    /// Move an existing ref to `sha`.
    ///
    /// Without `force` the move must be a fast-forward. Branch refs are
    /// moved under the branch lock so they never race a file write.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::ObjectNotFound`] if the ref or the target is missing
    /// - [`GatewayError::WriteConflict`] for a non-fast-forward move without
    ///   `force`, or when the ref moved concurrently
    pub fn update_ref(
        &self,
        repo: &str,
        name: &str,
        sha: &str,
        force: bool,
    ) -> Result<RefJson, GatewayError> {
        let git = self.open(repo)?;
        let refname = RefName::from_client(name)?;
        let target = Oid::new(sha)?;
        git.kind_of(&target)?;

        let _lock = match refname.strip_prefix("refs/heads/") {
            Some(branch) => Some(BranchLock::acquire(
                git.path(),
                &BranchName::new(branch)?,
                self.lock_timeout,
            )?),
            None => None,
        };

        let current = git.find_ref(&refname)?;
        if !force && !git.is_fast_forward(&current.oid, &target)? {
            return Err(GatewayError::WriteConflict(format!(
                "{refname} at {} does not fast-forward to {target}",
                current.oid
            )));
        }
        git.update_ref_cas(&refname, &target, Some(&current.oid), "gitapi: update ref")?;

        info!(repo, refname = %refname, from = %current.oid, to = %target, force, "updated ref");
        Ok(translate::reference(&git.find_ref(&refname)?))
    }

    /// Create a branch at `sha`, or at the head of `from` (default `HEAD`).
    ///
    /// # Errors
    ///
    /// - [`GatewayError::ObjectNotFound`] if the start names no commit
    /// - [`GatewayError::WriteConflict`] if the branch already exists
    pub fn create_branch(
        &self,
        repo: &str,
        name: &str,
        from: Option<&str>,
        sha: Option<&str>,
    ) -> Result<HeadJson, GatewayError> {
        let git = self.open(repo)?;
        let branch = BranchName::new(name)?;

        let start = match sha {
            Some(sha) => {
                let oid = Oid::new(sha)?;
                if git.kind_of(&oid)? != ObjectKind::Commit {
                    return Err(GatewayError::InvalidArgument(format!(
                        "{sha} is not a commit"
                    )));
                }
                oid
            }
            None => {
                let spec = from.unwrap_or(DEFAULT_START);
                git.resolve_commit(spec)?
                    .ok_or_else(|| GatewayError::ObjectNotFound {
                        what: spec.to_string(),
                    })?
            }
        };

        let _lock = BranchLock::acquire(git.path(), &branch, self.lock_timeout)?;
        git.create_ref(&RefName::for_branch(&branch), &start, "gitapi: create branch")?;

        info!(repo, branch = %branch, commit = %start, "created branch");
        Ok(translate::head(&BranchEntry {
            name: branch,
            oid: start,
        }))
    }

    /// Create an annotated tag.
    pub fn create_tag(&self, repo: &str, request: TagRequest) -> Result<ObjectRefJson, GatewayError> {
        let git = self.open(repo)?;
        RefName::for_tag(&request.tag)?;
        let kind = ObjectKind::parse(&request.kind)?;
        let target = Oid::new(request.sha.as_str())?;
        require(&request.user, "user")?;
        require(&request.email, "email")?;

        let tagger = Identity::new(request.user, request.email);
        let oid = git.create_tag(&request.tag, &target, kind, &tagger, &request.message)?;

        info!(repo, tag = %request.tag, target = %target, "created tag");
        Ok(translate::object_ref(&oid, ObjectKind::Tag))
    }
}
