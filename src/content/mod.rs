//! content
//!
//! Content policy for bytes leaving the object store.
//!
//! # Modules
//!
//! - [`classify`] - Binary classifier (filename tiers, then content sniffing)
//! - [`encoding`] - Display-text normalization and transport decoding
//!
//! # Invariants
//!
//! - Text handed to the translator is always valid UTF-8
//! - Content classified as binary is never exposed as text; it becomes `""`

pub mod classify;
pub mod encoding;

pub use classify::{BinaryClassifier, DefaultClassifier};
pub use encoding::{decode_transport, to_display_text, ContentError, TransportEncoding};
