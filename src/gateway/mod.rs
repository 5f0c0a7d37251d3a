//! gateway
//!
//! The operations the HTTP and CLI front ends call.
//!
//! # Architecture
//!
//! A [`Gateway`] holds only immutable configuration and the binary
//! classifier. Every operation opens its repository fresh through the
//! locator, does its git work through [`crate::git::Git`], and returns a
//! JSON shape from [`crate::translate`].
//!
//! - [`locator`] - Repository open/create and hook activation
//! - [`read`] - Trees, blobs, refs, tags, history and blame
//! - [`write`] - Index Mutator: single-file commits, branches, refs and tags
//! - [`error`] - [`GatewayError`] taxonomy
//!
//! # Invariants
//!
//! - Operations are synchronous; async callers run them on a blocking pool
//! - Writes to one branch are serialized by a per-branch file lock
//!
//! # Example
//!
//! ```no_run
//! use gitapi::core::config::Config;
//! use gitapi::gateway::{FileChange, Gateway, Mutation};
//!
//! let gateway = Gateway::new(&Config::default());
//! gateway.create_repository("site", &[]).unwrap();
//!
//! let written = gateway
//!     .commit_file_change(
//!         "site.git",
//!         FileChange {
//!             branch: "master".into(),
//!             path: "index.html".into(),
//!             mutation: Mutation::Upsert {
//!                 content: "<h1>Hi</h1>".into(),
//!                 encoding: None,
//!             },
//!             author_name: "Ann".into(),
//!             author_email: "ann@example.com".into(),
//!             message: "Add index".into(),
//!             source_branch: None,
//!         },
//!     )
//!     .unwrap();
//! println!("committed {}", written.commit_sha);
//! ```

pub mod error;
pub mod locator;
pub mod read;
pub mod write;

pub use error::{CreationFailure, GatewayError};
pub use locator::SUPPORTED_HOOKS;
pub use read::CommitQuery;
pub use write::{FileChange, Mutation, TagRequest};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::content::{BinaryClassifier, DefaultClassifier};
use crate::core::config::Config;
use crate::core::paths::StoragePaths;
use crate::core::types::BranchName;

/// Entry point for every repository operation.
#[derive(Debug, Clone)]
pub struct Gateway {
    paths: StoragePaths,
    default_branch: BranchName,
    lock_timeout: Duration,
    default_hooks: Vec<String>,
    classifier: Arc<dyn BinaryClassifier>,
}

impl Gateway {
    /// Build a gateway from effective configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            paths: StoragePaths::new(config.storage_root()),
            default_branch: config.default_branch(),
            lock_timeout: config.lock_timeout(),
            default_hooks: config.default_hooks().to_vec(),
            classifier: Arc::new(DefaultClassifier::default()),
        }
    }

    /// Replace the binary classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn BinaryClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Directory holding the repositories.
    pub fn storage_root(&self) -> &Path {
        self.paths.root()
    }

    pub(crate) fn classifier(&self) -> &dyn BinaryClassifier {
        self.classifier.as_ref()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::core::config::GatewayConfig;
    use tempfile::TempDir;

    /// A gateway over a fresh temporary storage root.
    pub fn gateway() -> (TempDir, Gateway) {
        gateway_with_timeout(5000)
    }

    pub fn gateway_with_timeout(lock_timeout_ms: u64) -> (TempDir, Gateway) {
        let dir = TempDir::new().unwrap();
        let config = Config::from_file_config(GatewayConfig {
            storage_root: Some(dir.path().to_path_buf()),
            lock_timeout_ms: Some(lock_timeout_ms),
            ..Default::default()
        })
        .unwrap();
        (dir, Gateway::new(&config))
    }

    pub fn put(gateway: &Gateway, repo: &str, branch: &str, path: &str, data: &str) -> String {
        put_from(gateway, repo, branch, path, data, None)
    }

    pub fn put_from(
        gateway: &Gateway,
        repo: &str,
        branch: &str,
        path: &str,
        data: &str,
        source: Option<&str>,
    ) -> String {
        gateway
            .commit_file_change(
                repo,
                FileChange {
                    branch: branch.to_string(),
                    path: path.to_string(),
                    mutation: Mutation::Upsert {
                        content: data.to_string(),
                        encoding: Some("utf-8".to_string()),
                    },
                    author_name: "Rune Madsen".to_string(),
                    author_email: "rune@example.com".to_string(),
                    message: format!("write {path}"),
                    source_branch: source.map(str::to_string),
                },
            )
            .unwrap()
            .commit_sha
    }
}
