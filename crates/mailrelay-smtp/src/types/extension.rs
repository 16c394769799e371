//! SMTP service extensions advertised in the EHLO reply.

use std::fmt;

/// SMTP extension offered by the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    /// SIZE - Maximum message size in bytes
    Size(usize),
    /// 8BITMIME - 8-bit MIME transport
    EightBitMime,
    /// PIPELINING - Command pipelining
    Pipelining,
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size(size) => write!(f, "SIZE {size}"),
            Self::EightBitMime => write!(f, "8BITMIME"),
            Self::Pipelining => write!(f, "PIPELINING"),
        }
    }
}
