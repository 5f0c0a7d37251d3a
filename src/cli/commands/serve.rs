//! serve command - run the HTTP server

use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::api;
use crate::cli::Context;

/// Serve the HTTP API until ctrl-c.
///
/// Repository operations are blocking; the multi-threaded runtime keeps a
/// blocking pool for them next to the async workers.
pub fn serve(ctx: Context, listen: Option<String>) -> Result<()> {
    let config = match listen {
        Some(addr) => ctx.config.with_listen(addr)?,
        None => ctx.config,
    };
    let addr = config.listen();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime
        .block_on(api::serve(Arc::new(ctx.gateway), addr))
        .with_context(|| format!("server on {addr} failed"))
}
