//! content::classify
//!
//! Decides whether blob or diff content is binary.
//!
//! # Tiers
//!
//! Checks run in this order and the first decisive tier wins:
//!
//! 1. Known image extension → binary, regardless of content
//! 2. Text allow-list extension → text
//! 3. Content sniffing over the first [`SNIFF_LEN`] bytes
//!
//! The extension tiers run first because short or empty files carry too
//! little content for sniffing to be reliable.
//!
//! # Example
//!
//! ```
//! use gitapi::content::{BinaryClassifier, DefaultClassifier};
//!
//! let classifier = DefaultClassifier::default();
//! assert!(classifier.is_binary(Some("logo.png"), b""));
//! assert!(!classifier.is_binary(Some("README.md"), b"\x00\x01"));
//! assert!(classifier.is_binary(Some("data.bin"), b"\x00\x01\x02"));
//! assert!(!classifier.is_binary(Some("notes"), b"plain text"));
//! ```

use std::path::Path;

/// Number of leading bytes inspected by content sniffing.
pub const SNIFF_LEN: usize = 8000;

/// Share of control bytes above which content counts as binary.
const CONTROL_RATIO_LIMIT: f64 = 0.10;

/// Extensions always treated as images.
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "tif", "tiff", "webp", "psd", "heic", "avif",
];

/// Extensions always treated as text.
const TEXT_EXTENSIONS: &[&str] = &["md", "markdown", "txt", "rst", "adoc"];

/// Pluggable binary/text decision.
///
/// Implementations must be deterministic: the same name and bytes always
/// classify the same way, so repeated reads of a file agree.
pub trait BinaryClassifier: Send + Sync + std::fmt::Debug {
    /// Whether `content` (optionally stored under `filename`) is binary.
    fn is_binary(&self, filename: Option<&str>, content: &[u8]) -> bool;
}

/// Extension tiers plus content sniffing.
#[derive(Debug, Clone)]
pub struct DefaultClassifier {
    image_extensions: Vec<String>,
    text_extensions: Vec<String>,
}

impl Default for DefaultClassifier {
    fn default() -> Self {
        Self {
            image_extensions: IMAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            text_extensions: TEXT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DefaultClassifier {
    /// Add an extension to the text allow-list.
    pub fn with_text_extension(mut self, ext: &str) -> Self {
        self.text_extensions.push(ext.to_ascii_lowercase());
        self
    }

    /// Add an extension to the image list.
    pub fn with_image_extension(mut self, ext: &str) -> Self {
        self.image_extensions.push(ext.to_ascii_lowercase());
        self
    }

    fn extension(filename: &str) -> Option<String> {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// Whether the filename has a known image extension.
    pub fn is_image(&self, filename: &str) -> bool {
        Self::extension(filename).is_some_and(|ext| self.image_extensions.contains(&ext))
    }

    fn is_text_listed(&self, filename: &str) -> bool {
        Self::extension(filename).is_some_and(|ext| self.text_extensions.contains(&ext))
    }
}

impl BinaryClassifier for DefaultClassifier {
    fn is_binary(&self, filename: Option<&str>, content: &[u8]) -> bool {
        if let Some(name) = filename {
            if self.is_image(name) {
                return true;
            }
            if self.is_text_listed(name) {
                return false;
            }
        }
        sniff_binary(content)
    }
}

/// Content sniffing tier.
///
/// Binary when the sample contains a NUL byte, is not valid UTF-8, or is
/// more than a tenth control bytes (common whitespace and escape excluded).
/// A multi-byte sequence cut off by the sample boundary is not an error.
pub fn sniff_binary(content: &[u8]) -> bool {
    let sample = &content[..content.len().min(SNIFF_LEN)];
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    if let Err(err) = std::str::from_utf8(sample) {
        if err.error_len().is_some() {
            return true;
        }
    }

    let control = sample.iter().filter(|&&b| is_suspicious_control(b)).count();
    (control as f64 / sample.len() as f64) > CONTROL_RATIO_LIMIT
}

fn is_suspicious_control(byte: u8) -> bool {
    match byte {
        b'\t' | b'\n' | b'\r' | 0x0c | 0x1b => false,
        0x00..=0x1f | 0x7f => true,
        _ => false,
    }
}
