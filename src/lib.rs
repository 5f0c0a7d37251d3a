//! gitapi - a JSON REST gateway over bare Git repositories
//!
//! gitapi lets remote clients create bare repositories, read trees, blobs,
//! refs, tags, history and blame, and commit single-file changes to branches
//! without a working directory.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to the gateway)
//! - [`api`] - HTTP front end (axum routes over the gateway)
//! - [`gateway`] - Repository operations: locate, read, write
//! - [`translate`] - Git objects → JSON shapes
//! - [`content`] - Binary classification and transport encodings
//! - [`core`] - Domain types, configuration, storage paths and branch locks
//! - [`git`] - Single interface for all Git operations
//!
//! # Correctness Invariants
//!
//! 1. Every write is exactly one commit on exactly one branch
//! 2. A branch ref only moves by compare-and-swap from the head the write saw
//! 3. Nothing outside [`git`] talks to libgit2
//! 4. Binary content is never emitted as text

pub mod api;
pub mod cli;
pub mod content;
pub mod core;
pub mod gateway;
pub mod git;
pub mod translate;
