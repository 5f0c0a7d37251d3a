//! gateway::read
//!
//! Read Path: tree, blob, ref, tag, history and blame retrieval.
//!
//! All reads open the repository fresh and never write to it. Text content
//! passes through the gateway's classifier on its way into JSON.

use serde::Deserialize;
use tracing::debug;

use super::error::GatewayError;
use super::Gateway;
use crate::core::types::{Oid, RefName};
use crate::git::WalkOrder;
use crate::translate::{
    self, BlameJson, BlobJson, CommitJson, HeadJson, ObjectJson, RefJson, TagJson, TreeJson,
};

/// Revision history starts from when none is given.
pub const DEFAULT_START: &str = "HEAD";

/// Options for listing history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitQuery {
    /// Branch or revision to walk from (default `HEAD`)
    pub start: Option<String>,
    /// Attach each commit's diff against its first parent
    #[serde(default)]
    pub diffs: bool,
    /// `oldest` (default) or `newest`
    pub order: Option<String>,
}

impl CommitQuery {
    fn walk_order(&self) -> Result<WalkOrder, GatewayError> {
        match self.order.as_deref() {
            None | Some("oldest") => Ok(WalkOrder::OldestFirst),
            Some("newest") => Ok(WalkOrder::NewestFirst),
            Some(other) => Err(GatewayError::InvalidArgument(format!(
                "unknown order '{other}', expected 'oldest' or 'newest'"
            ))),
        }
    }
}

impl Gateway {
    /// List local branches.
    pub fn branches(&self, repo: &str) -> Result<Vec<HeadJson>, GatewayError> {
        let git = self.open(repo)?;
        Ok(git.list_branches()?.iter().map(translate::head).collect())
    }

    /// Root tree of a branch or revision; empty when it names nothing.
    pub fn tree(&self, repo: &str, revision: &str) -> Result<TreeJson, GatewayError> {
        let git = self.open(repo)?;
        Ok(translate::tree(&git.tree_at(revision)?))
    }

    /// The tree or file at `path` of a branch or revision.
    pub fn object_at(
        &self,
        repo: &str,
        revision: &str,
        path: &str,
    ) -> Result<ObjectJson, GatewayError> {
        let git = self.open(repo)?;
        let object = git.object_at(revision, path).map_err(|e| {
            debug!(repo, revision, path, error = %e, "path lookup missed");
            GatewayError::from(e)
        })?;
        Ok(translate::object(&object, self.classifier()))
    }

    /// A blob by content hash.
    pub fn blob(&self, repo: &str, sha: &str) -> Result<BlobJson, GatewayError> {
        let git = self.open(repo)?;
        let oid = Oid::new(sha).map_err(|_| GatewayError::ObjectNotFound {
            what: sha.to_string(),
        })?;
        let blob = git.read_blob(&oid)?;
        Ok(translate::blob(&blob, self.classifier()))
    }

    /// A tree by hash; a commit hash lists that commit's root tree.
    pub fn tree_by_sha(&self, repo: &str, sha: &str) -> Result<TreeJson, GatewayError> {
        let git = self.open(repo)?;
        let oid = Oid::new(sha).map_err(|_| GatewayError::ObjectNotFound {
            what: sha.to_string(),
        })?;
        Ok(translate::tree(&git.read_tree(&oid)?))
    }

    /// Every ref with its target and target kind.
    pub fn refs(&self, repo: &str) -> Result<Vec<RefJson>, GatewayError> {
        let git = self.open(repo)?;
        Ok(git.list_refs()?.iter().map(translate::reference).collect())
    }

    /// One ref, by full name or branch short name.
    pub fn get_ref(&self, repo: &str, name: &str) -> Result<RefJson, GatewayError> {
        let git = self.open(repo)?;
        let refname = RefName::from_client(name).map_err(|_| GatewayError::ObjectNotFound {
            what: name.to_string(),
        })?;
        Ok(translate::reference(&git.find_ref(&refname)?))
    }

    /// Annotated and lightweight tags.
    pub fn tags(&self, repo: &str) -> Result<Vec<TagJson>, GatewayError> {
        let git = self.open(repo)?;
        Ok(git.list_tags()?.iter().map(translate::tag).collect())
    }

    /// One annotated tag object by hash.
    pub fn tag(&self, repo: &str, sha: &str) -> Result<TagJson, GatewayError> {
        let git = self.open(repo)?;
        let oid = Oid::new(sha).map_err(|_| GatewayError::ObjectNotFound {
            what: sha.to_string(),
        })?;
        Ok(translate::tag(&git.read_tag(&oid)?))
    }

    /// History reachable from `query.start`.
    pub fn commits(&self, repo: &str, query: &CommitQuery) -> Result<Vec<CommitJson>, GatewayError> {
        let order = query.walk_order()?;
        let git = self.open(repo)?;
        let start = query.start.as_deref().unwrap_or(DEFAULT_START);

        let history = git.walk_commits(start, order)?;
        let mut commits = Vec::with_capacity(history.len());
        for info in &history {
            let diffs = if query.diffs {
                Some(git.commit_diffs(&info.oid)?)
            } else {
                None
            };
            commits.push(translate::commit(info, diffs.as_deref(), self.classifier()));
        }
        Ok(commits)
    }

    /// One commit by hash.
    pub fn commit(&self, repo: &str, sha: &str, diffs: bool) -> Result<CommitJson, GatewayError> {
        let git = self.open(repo)?;
        let oid = Oid::new(sha).map_err(|_| GatewayError::ObjectNotFound {
            what: sha.to_string(),
        })?;
        let info = git.commit_info(&oid)?;
        let diffs = if diffs {
            Some(git.commit_diffs(&oid)?)
        } else {
            None
        };
        Ok(translate::commit(&info, diffs.as_deref(), self.classifier()))
    }

    /// Line attribution of a file at a branch or revision (default `HEAD`).
    pub fn blame(
        &self,
        repo: &str,
        path: &str,
        revision: Option<&str>,
    ) -> Result<BlameJson, GatewayError> {
        let git = self.open(repo)?;
        let revision = revision.unwrap_or(DEFAULT_START);
        let (file, hunks) = git.blame(revision, path)?;
        Ok(translate::blame(
            path.trim_matches('/'),
            &file,
            &hunks,
            self.classifier(),
        ))
    }
}
