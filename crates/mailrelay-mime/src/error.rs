//! Error types for message parsing.

use std::string::FromUtf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A header line is not `name: value` and not a continuation.
    #[error("Malformed header line {line}: {content:?}")]
    MalformedHeader {
        /// One-based line number within the header section.
        line: usize,
        /// Offending line, lossily decoded.
        content: String,
    },

    /// A continuation line appears before any header field.
    #[error("Continuation line before first header field")]
    LeadingContinuation,

    /// The payload has no header fields at all.
    #[error("Message has no header section")]
    MissingHeaders,

    /// Invalid encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),
}
