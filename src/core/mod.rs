//! core
//!
//! Core domain types, configuration, paths and write locking.
//!
//! # Modules
//!
//! - [`types`] - Strong types: RepoName, BranchName, RefName, Oid, ObjectKind
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing under the storage root
//! - [`ops`] - Per-branch write locking
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid names from reaching git or the filesystem
//! - Configuration is an explicit value, never process-wide mutable state

pub mod config;
pub mod ops;
pub mod paths;
pub mod types;
