//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Read configuration from this file
//! - `--root <dir>`: Override the repository storage root
//! - `--debug`: Enable debug logging

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// gitapi - JSON REST gateway over bare Git repositories
#[derive(Parser, Debug)]
#[command(name = "gitapi")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (overrides $GITAPI_CONFIG and the default locations)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the bare repositories
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Author identity and message shared by every write command.
#[derive(Args, Debug, Clone)]
pub struct Authorship {
    /// Author and committer name
    #[arg(long)]
    pub user: String,

    /// Author and committer email
    #[arg(long)]
    pub email: String,

    /// Commit message
    #[arg(short, long)]
    pub message: String,

    /// Seed the change from this branch's tree and head
    #[arg(long, value_name = "BRANCH")]
    pub from_branch: Option<String>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server
    #[command(after_help = "\
EXAMPLES:
    gitapi serve --root /srv/git --listen 0.0.0.0:4567
    RUST_LOG=gitapi=debug gitapi serve")]
    Serve {
        /// Address to listen on (default 127.0.0.1:4567)
        #[arg(long, value_name = "ADDR")]
        listen: Option<String>,
    },

    /// Create a bare repository
    #[command(name = "create-repo")]
    CreateRepo {
        /// Repository name; `.git` is appended when missing
        name: String,

        /// Activate a server-side hook (repeatable)
        #[arg(long = "hook", value_name = "HOOK")]
        hooks: Vec<String>,
    },

    /// Show a repository's path
    #[command(name = "show-repo")]
    ShowRepo {
        /// Repository name, including `.git`
        repo: String,
    },

    /// List branches
    Branches { repo: String },

    /// Create a branch at a commit
    Branch {
        repo: String,
        name: String,

        /// Start at this branch's head (default HEAD)
        #[arg(long, value_name = "BRANCH", conflicts_with = "sha")]
        from_branch: Option<String>,

        /// Start at this commit
        #[arg(long)]
        sha: Option<String>,
    },

    /// List a directory or show a file on a branch
    Ls {
        repo: String,
        branch: String,
        /// Path inside the tree (default: root)
        path: Option<String>,
    },

    /// Create or update one file as a single commit
    #[command(after_help = "\
EXAMPLES:
    gitapi put site.git master index.html --data '<h1>Hi</h1>' \\
        --user Ann --email ann@example.com -m 'Add index'
    gitapi put site.git master logo.png --file logo.png \\
        --user Ann --email ann@example.com -m 'Add logo'")]
    Put {
        repo: String,
        branch: String,
        path: String,

        /// Content to write
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        data: Option<String>,

        /// Read content from a local file (sent base64-encoded)
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Transport encoding of --data: utf-8 or base64
        #[arg(long, conflicts_with = "file")]
        encoding: Option<String>,

        #[command(flatten)]
        authorship: Authorship,
    },

    /// Delete one file as a single commit
    Rm {
        repo: String,
        branch: String,
        path: String,

        #[command(flatten)]
        authorship: Authorship,
    },

    /// Show a blob by hash
    Blob { repo: String, sha: String },

    /// List a tree by tree or commit hash
    Tree { repo: String, sha: String },

    /// List refs, or show one
    Refs {
        repo: String,
        /// Full ref name or branch short name
        name: Option<String>,
    },

    /// Create a ref pointing at an object
    #[command(name = "create-ref")]
    CreateRef {
        repo: String,
        /// Full ref name, or a branch short name
        name: String,
        sha: String,
    },

    /// Move an existing ref
    #[command(name = "update-ref")]
    UpdateRef {
        repo: String,
        /// Full ref name, or a branch short name
        name: String,
        sha: String,

        /// Allow a move that is not a fast-forward
        #[arg(long)]
        force: bool,
    },

    /// List tags, or show one annotated tag by hash
    Tags {
        repo: String,
        /// Tag object hash
        sha: Option<String>,
    },

    /// Create an annotated tag
    Tag {
        repo: String,
        tag: String,
        sha: String,

        /// Kind of the tagged object
        #[arg(long = "type", default_value = "commit")]
        kind: String,

        #[arg(short, long)]
        message: String,

        #[arg(long)]
        user: String,

        #[arg(long)]
        email: String,
    },

    /// List commits
    Log {
        repo: String,

        /// Branch or revision to walk from (default HEAD)
        #[arg(long)]
        start: Option<String>,

        /// Include each commit's diff
        #[arg(long)]
        diffs: bool,

        /// List newest commits first
        #[arg(long)]
        newest_first: bool,
    },

    /// Show one commit
    Show {
        repo: String,
        sha: String,

        /// Include the commit's diff
        #[arg(long)]
        diffs: bool,
    },

    /// Show line attribution for a file
    Blame {
        repo: String,
        path: String,

        /// Branch or revision (default HEAD)
        #[arg(long)]
        branch: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["gitapi", "branches", "r.git", "--root", "/srv", "--debug"])
                .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/srv")));
        assert!(cli.debug);
        assert!(matches!(cli.command, Command::Branches { repo } if repo == "r.git"));
    }

    #[test]
    fn put_requires_content() {
        let missing = Cli::try_parse_from([
            "gitapi", "put", "r.git", "master", "a.txt", "--user", "a", "--email", "a@b",
            "-m", "msg",
        ]);
        assert!(missing.is_err());

        let both = Cli::try_parse_from([
            "gitapi", "put", "r.git", "master", "a.txt", "--data", "x", "--file", "f",
            "--user", "a", "--email", "a@b", "-m", "msg",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn branch_start_is_sha_or_branch() {
        let both = Cli::try_parse_from([
            "gitapi", "branch", "r.git", "feature", "--from-branch", "master", "--sha", "abc",
        ]);
        assert!(both.is_err());

        let cli = Cli::try_parse_from(["gitapi", "branch", "r.git", "feature"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Branch { from_branch: None, sha: None, .. }
        ));
    }

    #[test]
    fn update_ref_force_flag() {
        let cli = Cli::try_parse_from(["gitapi", "update-ref", "r.git", "master", "abc", "--force"])
            .unwrap();
        assert!(matches!(cli.command, Command::UpdateRef { force: true, .. }));
    }

    #[test]
    fn put_with_source_branch() {
        let cli = Cli::try_parse_from([
            "gitapi", "put", "r.git", "feature", "b.txt", "--data", "b", "--user", "a",
            "--email", "a@b", "-m", "msg", "--from-branch", "master",
        ])
        .unwrap();
        match cli.command {
            Command::Put { authorship, .. } => {
                assert_eq!(authorship.from_branch.as_deref(), Some("master"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
