//! Replies written back to the client.

use std::fmt::{self, Write as _};

/// A possibly multi-line SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code.
    pub code: ReplyCode,
    /// Text lines; every line but the last is sent with `-`.
    pub lines: Vec<String>,
}

impl Reply {
    /// Creates a reply from its lines.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec is not const-compatible
    pub fn new(code: ReplyCode, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// Creates a single-line reply.
    #[must_use]
    pub fn single(code: ReplyCode, text: impl Into<String>) -> Self {
        Self::new(code, vec![text.into()])
    }

    /// Wire form: `250-first\r\n250 last\r\n`.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let Some((last, init)) = self.lines.split_last() else {
            return format!("{}\r\n", self.code).into_bytes();
        };

        let mut out = String::new();
        for line in init {
            let _ = write!(out, "{}-{line}\r\n", self.code);
        }
        let _ = write!(out, "{} {last}\r\n", self.code);
        out.into_bytes()
    }
}

/// Three-digit SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 Service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Service closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 252 Cannot VRFY user, but will accept message
    pub const CANNOT_VERIFY: Self = Self(252);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);
    /// 421 Service not available, closing transmission channel
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 451 Local error in processing
    pub const LOCAL_ERROR: Self = Self(451);
    /// 452 Insufficient system storage (also: too many recipients)
    pub const INSUFFICIENT_STORAGE: Self = Self(452);
    /// 500 Syntax error, command unrecognized
    pub const SYNTAX_ERROR: Self = Self(500);
    /// 501 Syntax error in parameters or arguments
    pub const PARAMETER_ERROR: Self = Self(501);
    /// 502 Command not implemented
    pub const NOT_IMPLEMENTED: Self = Self(502);
    /// 503 Bad sequence of commands
    pub const BAD_SEQUENCE: Self = Self(503);
    /// 552 Exceeded storage allocation
    pub const EXCEEDED_STORAGE: Self = Self(552);
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_single_line() {
        let reply = Reply::single(ReplyCode::OK, "OK");
        assert_eq!(reply.serialize(), b"250 OK\r\n");
    }

    #[test]
    fn serialize_multi_line() {
        let reply = Reply::new(
            ReplyCode::OK,
            vec!["relay.local".to_string(), "PIPELINING".to_string(), "8BITMIME".to_string()],
        );
        assert_eq!(
            reply.serialize(),
            b"250-relay.local\r\n250-PIPELINING\r\n250 8BITMIME\r\n"
        );
    }

    #[test]
    fn serialize_without_text() {
        let reply = Reply::new(ReplyCode::CLOSING, vec![]);
        assert_eq!(reply.serialize(), b"221\r\n");
    }

    #[test]
    fn code_display() {
        assert_eq!(ReplyCode::LOCAL_ERROR.to_string(), "451");
        assert_eq!(ReplyCode::CANNOT_VERIFY.to_string(), "252");
    }
}
