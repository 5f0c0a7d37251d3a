//! gateway::locator
//!
//! Repository Locator: names → bare repositories under the storage root.
//!
//! Opening never creates anything. Creation appends `.git` to the name when
//! it is missing, points `HEAD` at the configured default branch and
//! activates the requested server-side hooks.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::error::{CreationFailure, GatewayError};
use super::Gateway;
use crate::core::paths::StoragePaths;
use crate::core::types::RepoName;
use crate::git::{Git, GitError};
use crate::translate::{self, RepositoryJson};

/// Hooks that can be activated on creation.
pub const SUPPORTED_HOOKS: &[&str] = &["post-update", "post-receive"];

const POST_UPDATE_SCRIPT: &str = "#!/bin/sh\n\
# Keep dumb-HTTP metadata current after every ref update.\n\
exec git update-server-info\n";

const POST_RECEIVE_SCRIPT: &str = "#!/bin/sh\n\
# Receives \"<old-sha> <new-sha> <ref>\" lines on stdin after a push.\n\
while read oldrev newrev refname; do\n\
    :\n\
done\n\
exit 0\n";

fn builtin_script(hook: &str) -> Option<&'static str> {
    match hook {
        "post-update" => Some(POST_UPDATE_SCRIPT),
        "post-receive" => Some(POST_RECEIVE_SCRIPT),
        _ => None,
    }
}

impl Gateway {
    /// Open the repository stored under exactly `name`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::RepositoryNotFound`] if the name is unsafe, or
    ///   nothing openable lives at its path
    pub(crate) fn open(&self, name: &str) -> Result<Git, GatewayError> {
        let not_found = || GatewayError::RepositoryNotFound {
            name: name.to_string(),
        };
        let repo_name = RepoName::new(name).map_err(|_| not_found())?;
        let path = self.paths.repo_path(&repo_name);

        Git::open_bare(&path).map_err(|e| {
            debug!(repo = name, error = %e, "repository lookup missed");
            not_found()
        })
    }

    /// Describe an existing repository.
    pub fn repository(&self, name: &str) -> Result<RepositoryJson, GatewayError> {
        let git = self.open(name)?;
        Ok(translate::repository(git.path()))
    }

    /// Create a bare repository and activate hooks.
    ///
    /// Configured default hooks are activated in addition to `hooks`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::RepositoryCreationFailed`] with reason
    ///   `InvalidName`, `Exists` or `Io`
    pub fn create_repository(
        &self,
        name: &str,
        hooks: &[String],
    ) -> Result<RepositoryJson, GatewayError> {
        let repo_name = RepoName::new(name)
            .map_err(|e| GatewayError::RepositoryCreationFailed {
                reason: CreationFailure::InvalidName,
                message: e.to_string(),
            })?
            .with_git_suffix();
        let path = self.paths.repo_path(&repo_name);

        let io_failure = |message: String| GatewayError::RepositoryCreationFailed {
            reason: CreationFailure::Io,
            message,
        };

        if path.exists() {
            return Err(GatewayError::RepositoryCreationFailed {
                reason: CreationFailure::Exists,
                message: format!("repository '{}' already exists", repo_name),
            });
        }

        fs::create_dir_all(self.paths.root()).map_err(|e| {
            io_failure(format!(
                "cannot create storage root {}: {}",
                self.paths.root().display(),
                e
            ))
        })?;

        let git = Git::init_bare(&path, &self.default_branch).map_err(|e| match e {
            GitError::AlreadyExists { .. } => GatewayError::RepositoryCreationFailed {
                reason: CreationFailure::Exists,
                message: format!("repository '{}' already exists", repo_name),
            },
            other => io_failure(other.to_string()),
        })?;

        let mut requested: Vec<&str> = Vec::new();
        for hook in self.default_hooks.iter().chain(hooks) {
            if !requested.contains(&hook.as_str()) {
                requested.push(hook.as_str());
            }
        }
        let activated = activate_hooks(git.path(), &requested)
            .map_err(|e| io_failure(format!("cannot activate hooks: {e}")))?;

        info!(
            repo = %repo_name,
            path = %git.path().display(),
            hooks = ?activated,
            "created repository"
        );
        Ok(translate::repository(git.path()))
    }
}

/// Activate supported hooks, returning the names that were activated.
///
/// An existing `<hook>.sample` is renamed into place; otherwise a built-in
/// script is written. Either way the hook ends up executable.
pub fn activate_hooks(repo_path: &Path, hooks: &[&str]) -> std::io::Result<Vec<String>> {
    let hooks_dir = StoragePaths::hooks_dir(repo_path);
    let mut activated = Vec::new();

    for &hook in hooks {
        let Some(script) = builtin_script(hook) else {
            debug!(hook, "ignoring unsupported hook");
            continue;
        };

        fs::create_dir_all(&hooks_dir)?;
        let target = hooks_dir.join(hook);
        let sample = hooks_dir.join(format!("{hook}.sample"));

        if sample.is_file() {
            fs::rename(&sample, &target)?;
        } else {
            fs::write(&target, script)?;
        }
        make_executable(&target)?;
        activated.push(hook.to_string());
    }

    Ok(activated)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
