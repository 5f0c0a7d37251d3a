//! gateway::error
//!
//! The error taxonomy every gateway operation reports.
//!
//! Lower layers keep their own error enums ([`GitError`], [`LockError`],
//! [`TypeError`], [`ContentError`]); each converts into [`GatewayError`] here
//! so callers see one classification of client and server failures.

use thiserror::Error;

use crate::content::ContentError;
use crate::core::ops::LockError;
use crate::core::types::TypeError;
use crate::git::GitError;

/// Why repository creation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationFailure {
    /// Empty name, path separators or `..`
    InvalidName,
    /// A file or repository already occupies the path
    Exists,
    /// The filesystem refused
    Io,
}

/// Errors from gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No repository at the requested name.
    #[error("repository not found: {name}")]
    RepositoryNotFound { name: String },

    /// A revision, path, blob or ref lookup missed.
    #[error("object not found: {what}")]
    ObjectNotFound { what: String },

    /// Request content could not be decoded.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// A request argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A repository could not be created.
    #[error("repository creation failed: {message}")]
    RepositoryCreationFailed {
        reason: CreationFailure,
        message: String,
    },

    /// A concurrent write won; the caller may retry.
    #[error("write conflict: {0}")]
    WriteConflict(String),

    /// Unexpected object-store failure.
    #[error("git failure: {0}")]
    Git(GitError),

    /// Unexpected lock failure.
    #[error("lock failure: {0}")]
    Lock(LockError),

    /// Unexpected filesystem failure.
    #[error("filesystem failure: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Whether the caller caused the failure.
    pub fn is_client_error(&self) -> bool {
        match self {
            GatewayError::RepositoryNotFound { .. }
            | GatewayError::ObjectNotFound { .. }
            | GatewayError::InvalidEncoding(_)
            | GatewayError::InvalidArgument(_)
            | GatewayError::WriteConflict(_) => true,
            GatewayError::RepositoryCreationFailed { reason, .. } => {
                *reason != CreationFailure::Io
            }
            GatewayError::Git(_) | GatewayError::Lock(_) | GatewayError::Io(_) => false,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::RepositoryNotFound { .. } => "repository_not_found",
            GatewayError::ObjectNotFound { .. } => "object_not_found",
            GatewayError::InvalidEncoding(_) => "invalid_encoding",
            GatewayError::InvalidArgument(_) => "invalid_argument",
            GatewayError::RepositoryCreationFailed { .. } => "repository_creation_failed",
            GatewayError::WriteConflict(_) => "write_conflict",
            GatewayError::Git(_) => "git_error",
            GatewayError::Lock(_) => "lock_error",
            GatewayError::Io(_) => "io_error",
        }
    }
}

impl From<GitError> for GatewayError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::NotARepo { path } => GatewayError::RepositoryNotFound {
                name: path.display().to_string(),
            },
            GitError::RefNotFound { refname } => GatewayError::ObjectNotFound { what: refname },
            GitError::ObjectNotFound { oid } => GatewayError::ObjectNotFound { what: oid },
            GitError::PathNotFound { path } => GatewayError::ObjectNotFound { what: path },
            GitError::InvalidOid { oid } => GatewayError::ObjectNotFound { what: oid },
            GitError::InvalidRefName { message } | GitError::InvalidInput { message } => {
                GatewayError::InvalidArgument(message)
            }
            e @ (GitError::CasFailed { .. } | GitError::AlreadyExists { .. }) => {
                GatewayError::WriteConflict(e.to_string())
            }
            e => GatewayError::Git(e),
        }
    }
}

impl From<LockError> for GatewayError {
    fn from(err: LockError) -> Self {
        match err {
            e @ LockError::Timeout { .. } => GatewayError::WriteConflict(e.to_string()),
            e => GatewayError::Lock(e),
        }
    }
}

impl From<TypeError> for GatewayError {
    fn from(err: TypeError) -> Self {
        GatewayError::InvalidArgument(err.to_string())
    }
}

impl From<ContentError> for GatewayError {
    fn from(err: ContentError) -> Self {
        GatewayError::InvalidEncoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn git_errors_classify() {
        let err: GatewayError = GitError::NotARepo {
            path: PathBuf::from("/x"),
        }
        .into();
        assert!(matches!(err, GatewayError::RepositoryNotFound { .. }));

        let err: GatewayError = GitError::PathNotFound { path: "a".into() }.into();
        assert!(matches!(err, GatewayError::ObjectNotFound { .. }));

        let err: GatewayError = GitError::CasFailed {
            refname: "refs/heads/master".into(),
            expected: "a".into(),
            actual: "b".into(),
        }
        .into();
        assert!(matches!(err, GatewayError::WriteConflict(_)));

        let err: GatewayError = GitError::Internal {
            message: "boom".into(),
        }
        .into();
        assert!(!err.is_client_error());
        assert_eq!(err.code(), "git_error");
    }

    #[test]
    fn lock_timeout_is_conflict() {
        let err: GatewayError = LockError::Timeout {
            branch: "master".into(),
        }
        .into();
        assert!(matches!(err, GatewayError::WriteConflict(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn creation_failure_severity_follows_reason() {
        let collision = GatewayError::RepositoryCreationFailed {
            reason: CreationFailure::Exists,
            message: "taken".into(),
        };
        let io = GatewayError::RepositoryCreationFailed {
            reason: CreationFailure::Io,
            message: "disk".into(),
        };
        assert!(collision.is_client_error());
        assert!(!io.is_client_error());
    }

    #[test]
    fn content_errors_are_invalid_encoding() {
        let err: GatewayError = ContentError::UnknownEncoding("ebcdic".into()).into();
        assert_eq!(err.code(), "invalid_encoding");
    }
}
