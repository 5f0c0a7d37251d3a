//! content::encoding
//!
//! Byte ↔ text conversions at the API boundary.
//!
//! - [`to_display_text`] turns stored bytes into valid UTF-8 for JSON output,
//!   dropping sequences that cannot be decoded.
//! - [`decode_transport`] turns a request's text-transport payload into the
//!   bytes to store, according to its declared encoding.

use base64::{engine::general_purpose, Engine};
use thiserror::Error;

/// Errors from decoding request content.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("unsupported content encoding '{0}'")]
    UnknownEncoding(String),

    #[error("content is not valid base64: {0}")]
    InvalidBase64(String),
}

/// How request content is carried inside a JSON string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEncoding {
    /// Content is the text itself.
    Utf8,
    /// Content is base64 of the raw bytes.
    Base64,
}

impl TransportEncoding {
    /// Parse an encoding name, case-insensitively.
    ///
    /// ```
    /// use gitapi::content::TransportEncoding;
    ///
    /// assert_eq!(TransportEncoding::parse("UTF-8").unwrap(), TransportEncoding::Utf8);
    /// assert_eq!(TransportEncoding::parse("base64").unwrap(), TransportEncoding::Base64);
    /// assert!(TransportEncoding::parse("latin1").is_err());
    /// ```
    pub fn parse(name: &str) -> Result<Self, ContentError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TransportEncoding::Utf8),
            "base64" => Ok(TransportEncoding::Base64),
            _ => Err(ContentError::UnknownEncoding(name.to_string())),
        }
    }
}

/// Decode request content into the bytes to store.
///
/// `encoding` defaults to UTF-8 when absent. Base64 payloads may contain
/// line breaks or other ASCII whitespace.
///
/// # Errors
///
/// - [`ContentError::UnknownEncoding`] for an unrecognized encoding name
/// - [`ContentError::InvalidBase64`] when a base64 payload does not decode
pub fn decode_transport(content: &str, encoding: Option<&str>) -> Result<Vec<u8>, ContentError> {
    let encoding = match encoding {
        Some(name) => TransportEncoding::parse(name)?,
        None => TransportEncoding::Utf8,
    };

    match encoding {
        TransportEncoding::Utf8 => Ok(content.as_bytes().to_vec()),
        TransportEncoding::Base64 => {
            let compact: String = content
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            general_purpose::STANDARD
                .decode(compact)
                .map_err(|e| ContentError::InvalidBase64(e.to_string()))
        }
    }
}

/// Convert stored bytes to display text.
///
/// Byte sequences that are not valid UTF-8 are dropped, never replaced, so
/// the result only contains characters that were actually present in the
/// input. Valid input, a leading byte-order mark included, is returned as is.
///
/// ```
/// use gitapi::content::to_display_text;
///
/// assert_eq!(to_display_text(b"Hello There"), "Hello There");
/// assert_eq!(to_display_text(b"caf\xe9!"), "caf!");
/// assert_eq!(to_display_text(b"\xef\xbb\xbfbom"), "\u{feff}bom");
/// ```
pub fn to_display_text(bytes: &[u8]) -> String {
    let mut rest = bytes;
    let mut out = String::with_capacity(rest.len());

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(err) => {
                let (valid, after) = rest.split_at(err.valid_up_to());
                // valid_up_to() marks a prefix that is guaranteed UTF-8
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match err.error_len() {
                    Some(len) => rest = &after[len..],
                    // Truncated sequence at the end of input
                    None => return out,
                }
            }
        }
    }
}
