//! cli
//!
//! Command-line interface layer for gitapi.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the tracing subscriber
//! - Load configuration and apply flag overrides
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Every command except `serve` calls one
//! [`crate::gateway::Gateway`] operation and prints its JSON result on
//! stdout. `serve` hands the same gateway to [`crate::api`].

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::gateway::Gateway;

/// Everything a command handler needs.
pub struct Context {
    pub config: Config,
    pub gateway: Gateway,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let loaded = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    for warning in &loaded.warnings {
        tracing::warn!(path = %warning.path.display(), "{}", warning.message);
    }

    let mut config = loaded.config;
    if let Some(root) = cli.root.clone() {
        config = config.with_storage_root(root);
    }

    let ctx = Context {
        gateway: Gateway::new(&config),
        config,
    };

    commands::dispatch(cli.command, ctx)
}

/// Log to stderr. `--debug` wins over `RUST_LOG`, which wins over the default.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("gitapi=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gitapi=info"))
    };
    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
