//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Converts its arguments into a gateway request
//! 2. Calls the gateway
//! 3. Prints the JSON result
//!
//! Handlers do NOT touch git directly.

mod files;
mod history;
mod refs;
mod repo;
mod serve;

pub use files::{ls, put, rm, tree};
pub use history::{blame, log, show};
pub use refs::{create_ref, refs, tag, tags, update_ref};
pub use repo::{branch, branches, create_repo, show_repo};
pub use serve::serve;

use anyhow::Result;
use serde::Serialize;

use super::args::Command;
use super::Context;

/// Run one parsed command.
pub fn dispatch(command: Command, ctx: Context) -> Result<()> {
    match command {
        Command::Serve { listen } => serve(ctx, listen),

        Command::CreateRepo { name, hooks } => create_repo(&ctx, &name, &hooks),
        Command::ShowRepo { repo } => show_repo(&ctx, &repo),
        Command::Branches { repo } => branches(&ctx, &repo),
        Command::Branch {
            repo,
            name,
            from_branch,
            sha,
        } => branch(&ctx, &repo, &name, from_branch.as_deref(), sha.as_deref()),

        Command::Ls { repo, branch, path } => ls(&ctx, &repo, &branch, path.as_deref()),
        Command::Put {
            repo,
            branch,
            path,
            data,
            file,
            encoding,
            authorship,
        } => put(
            &ctx,
            files::PutArgs {
                repo,
                branch,
                path,
                data,
                file,
                encoding,
                authorship,
            },
        ),
        Command::Rm {
            repo,
            branch,
            path,
            authorship,
        } => rm(&ctx, &repo, &branch, &path, authorship),
        Command::Blob { repo, sha } => files::blob(&ctx, &repo, &sha),
        Command::Tree { repo, sha } => tree(&ctx, &repo, &sha),

        Command::Refs { repo, name } => refs(&ctx, &repo, name.as_deref()),
        Command::CreateRef { repo, name, sha } => create_ref(&ctx, &repo, &name, &sha),
        Command::UpdateRef {
            repo,
            name,
            sha,
            force,
        } => update_ref(&ctx, &repo, &name, &sha, force),
        Command::Tags { repo, sha } => tags(&ctx, &repo, sha.as_deref()),
        Command::Tag {
            repo,
            tag: name,
            sha,
            kind,
            message,
            user,
            email,
        } => tag(
            &ctx,
            &repo,
            crate::gateway::TagRequest {
                tag: name,
                message,
                sha,
                kind,
                user,
                email,
            },
        ),

        Command::Log {
            repo,
            start,
            diffs,
            newest_first,
        } => log(&ctx, &repo, start, diffs, newest_first),
        Command::Show { repo, sha, diffs } => show(&ctx, &repo, &sha, diffs),
        Command::Blame { repo, path, branch } => blame(&ctx, &repo, &path, branch.as_deref()),
    }
}

/// Print a result as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
