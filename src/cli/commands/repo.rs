//! create-repo, show-repo, branches and branch commands

use anyhow::Result;

use super::print_json;
use crate::cli::Context;

/// Create a bare repository and print its path.
pub fn create_repo(ctx: &Context, name: &str, hooks: &[String]) -> Result<()> {
    print_json(&ctx.gateway.create_repository(name, hooks)?)
}

pub fn show_repo(ctx: &Context, repo: &str) -> Result<()> {
    print_json(&ctx.gateway.repository(repo)?)
}

pub fn branches(ctx: &Context, repo: &str) -> Result<()> {
    print_json(&ctx.gateway.branches(repo)?)
}

pub fn branch(
    ctx: &Context,
    repo: &str,
    name: &str,
    from_branch: Option<&str>,
    sha: Option<&str>,
) -> Result<()> {
    print_json(&ctx.gateway.create_branch(repo, name, from_branch, sha)?)
}
