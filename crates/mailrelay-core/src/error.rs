//! Error types for the core library.

use thiserror::Error;

/// Errors that stop the relay from starting or running.
#[derive(Debug, Error)]
pub enum Error {
    /// An allow-list entry is not a valid regular expression.
    #[error("Invalid allow-list pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The offending segment, trimmed.
        pattern: String,
        /// Compilation failure.
        #[source]
        source: regex::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential acquisition failed.
    #[error("OAuth error: {0}")]
    OAuth(#[from] mailrelay_oauth::Error),

    /// SMTP listener failed.
    #[error("SMTP error: {0}")]
    Smtp(#[from] mailrelay_smtp::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
