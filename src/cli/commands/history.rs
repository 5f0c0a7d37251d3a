//! log, show and blame commands

use anyhow::Result;

use super::print_json;
use crate::cli::Context;
use crate::gateway::CommitQuery;

/// List history from `start` (default `HEAD`), oldest first unless asked.
pub fn log(
    ctx: &Context,
    repo: &str,
    start: Option<String>,
    diffs: bool,
    newest_first: bool,
) -> Result<()> {
    let query = CommitQuery {
        start,
        diffs,
        order: newest_first.then(|| "newest".to_string()),
    };
    print_json(&ctx.gateway.commits(repo, &query)?)
}

pub fn show(ctx: &Context, repo: &str, sha: &str, diffs: bool) -> Result<()> {
    print_json(&ctx.gateway.commit(repo, sha, diffs)?)
}

pub fn blame(ctx: &Context, repo: &str, path: &str, branch: Option<&str>) -> Result<()> {
    print_json(&ctx.gateway.blame(repo, path, branch)?)
}
