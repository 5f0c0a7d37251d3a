//! api
//!
//! HTTP front end: an axum [`Router`] over a shared [`Gateway`].
//!
//! # Routes
//!
//! ```text
//! /health                                           GET
//! /repos                                            POST
//! /repos/{repo}                                     GET
//! ├── /branches                                     GET, POST
//! ├── /branches/{branch}/files                      GET, POST
//! ├── /branches/{branch}/files/{*path}              GET, DELETE
//! ├── /blobs/{sha}                                  GET
//! ├── /trees/{sha}                                  GET
//! ├── /refs                                         GET, POST
//! ├── /refs/{*ref}                                  GET, PATCH
//! ├── /tags                                         GET, POST
//! ├── /tags/{sha}                                   GET
//! ├── /commits                                      GET
//! ├── /commits/{sha}                                GET
//! └── /blame/{*path}                                GET
//! ```
//!
//! # Invariants
//!
//! - Handlers never touch git directly; every operation runs through
//!   [`Gateway`] on tokio's blocking pool
//! - Failures are `{ error, message }` bodies, see [`error`]

pub mod error;
pub mod handlers;

pub use error::{ApiError, ErrorBody};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tracing::info;

use crate::gateway::Gateway;
use handlers::*;

/// Build the router with every route.
pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/repos", post(create_repository))
        .nest("/repos/{repo}", repository_router())
        .layer(middleware::from_fn(log_requests))
        .with_state(gateway)
}

fn repository_router() -> Router<Arc<Gateway>> {
    Router::new()
        .route("/", get(get_repository))
        .route("/branches", get(list_branches).post(create_branch))
        .route(
            "/branches/{branch}/files",
            get(branch_root).post(write_file),
        )
        .route(
            "/branches/{branch}/files/{*path}",
            get(branch_path).delete(delete_file),
        )
        .route("/blobs/{sha}", get(get_blob))
        .route("/trees/{sha}", get(get_tree))
        .route("/refs", get(list_refs).post(create_ref))
        .route("/refs/{*ref}", get(get_ref).patch(update_ref))
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/{sha}", get(get_tag))
        .route("/commits", get(list_commits))
        .route("/commits/{sha}", get(get_commit))
        .route("/blame/{*path}", get(blame))
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        %uri,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "handled request"
    );
    response
}

/// Serve until ctrl-c.
pub async fn serve(gateway: Arc<Gateway>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        root = %gateway.storage_root().display(),
        "gitapi listening"
    );
    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c; shutting down");
        return;
    }
    info!("shutdown requested");
}
