//! core::ops
//!
//! Write serialization.
//!
//! # Modules
//!
//! - [`lock`] - Exclusive per-branch write lock
//!
//! # Architecture
//!
//! Every file write against a branch:
//! 1. Acquires that branch's lock
//! 2. Seeds, stages and seals the commit
//! 3. Advances the branch ref with compare-and-swap
//! 4. Releases the lock on drop

pub mod lock;

pub use lock::{BranchLock, LockError};
