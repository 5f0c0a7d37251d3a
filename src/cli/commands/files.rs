//! ls, put, rm, blob and tree commands

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::print_json;
use crate::cli::args::Authorship;
use crate::cli::Context;
use crate::gateway::{FileChange, Mutation};
use crate::translate::ObjectJson;

/// Show the branch root, or the tree or file at `path`.
pub fn ls(ctx: &Context, repo: &str, branch: &str, path: Option<&str>) -> Result<()> {
    match path {
        Some(path) if !path.trim_matches('/').is_empty() => {
            print_json(&ctx.gateway.object_at(repo, branch, path)?)
        }
        _ => print_json(&ObjectJson::Tree(ctx.gateway.tree(repo, branch)?)),
    }
}

/// Arguments of `put`.
pub struct PutArgs {
    pub repo: String,
    pub branch: String,
    pub path: String,
    pub data: Option<String>,
    pub file: Option<PathBuf>,
    pub encoding: Option<String>,
    pub authorship: Authorship,
}

/// Commit one file. `--file` content travels base64-encoded so binary
/// files survive unchanged.
pub fn put(ctx: &Context, args: PutArgs) -> Result<()> {
    let mutation = match (args.data, args.file) {
        (Some(content), _) => Mutation::Upsert {
            content,
            encoding: args.encoding,
        },
        (None, Some(file)) => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            Mutation::Upsert {
                content: STANDARD.encode(bytes),
                encoding: Some("base64".to_string()),
            }
        }
        (None, None) => anyhow::bail!("put needs --data or --file"),
    };

    let change = file_change(args.branch, args.path, mutation, args.authorship);
    print_json(&ctx.gateway.commit_file_change(&args.repo, change)?)
}

/// Delete one file.
pub fn rm(
    ctx: &Context,
    repo: &str,
    branch: &str,
    path: &str,
    authorship: Authorship,
) -> Result<()> {
    let change = file_change(
        branch.to_string(),
        path.to_string(),
        Mutation::Delete,
        authorship,
    );
    print_json(&ctx.gateway.commit_file_change(repo, change)?)
}

pub fn blob(ctx: &Context, repo: &str, sha: &str) -> Result<()> {
    print_json(&ctx.gateway.blob(repo, sha)?)
}

pub fn tree(ctx: &Context, repo: &str, sha: &str) -> Result<()> {
    print_json(&ObjectJson::Tree(ctx.gateway.tree_by_sha(repo, sha)?))
}

fn file_change(branch: String, path: String, mutation: Mutation, who: Authorship) -> FileChange {
    FileChange {
        branch,
        path,
        mutation,
        author_name: who.user,
        author_email: who.email,
        message: who.message,
        source_branch: who.from_branch,
    }
}
