//! Error types for SMTP operations.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Command verb not recognized.
    #[error("Unrecognized command: {0}")]
    UnknownCommand(String),

    /// Command recognized but its arguments are malformed.
    #[error("Syntax error in parameters: {0}")]
    Syntax(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Command line exceeds the protocol limit.
    #[error("Line too long")]
    LineTooLong,

    /// Client stayed silent for longer than the idle timeout.
    #[error("Connection idle for {0} seconds")]
    Timeout(u64),
}

impl Error {
    /// Creates a syntax error.
    #[must_use]
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(message.into())
    }
}

