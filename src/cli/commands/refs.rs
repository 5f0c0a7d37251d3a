//! refs, create-ref, update-ref, tags and tag commands

use anyhow::Result;

use super::print_json;
use crate::cli::Context;
use crate::gateway::TagRequest;

/// List every ref, or show the one named.
pub fn refs(ctx: &Context, repo: &str, name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => print_json(&ctx.gateway.get_ref(repo, name)?),
        None => print_json(&ctx.gateway.refs(repo)?),
    }
}

pub fn create_ref(ctx: &Context, repo: &str, name: &str, sha: &str) -> Result<()> {
    print_json(&ctx.gateway.create_ref(repo, name, sha)?)
}

/// Fast-forward a ref, or move it anywhere with `force`.
pub fn update_ref(ctx: &Context, repo: &str, name: &str, sha: &str, force: bool) -> Result<()> {
    print_json(&ctx.gateway.update_ref(repo, name, sha, force)?)
}

pub fn tags(ctx: &Context, repo: &str, sha: Option<&str>) -> Result<()> {
    match sha {
        Some(sha) => print_json(&ctx.gateway.tag(repo, sha)?),
        None => print_json(&ctx.gateway.tags(repo)?),
    }
}

pub fn tag(ctx: &Context, repo: &str, request: TagRequest) -> Result<()> {
    print_json(&ctx.gateway.create_tag(repo, request)?)
}
