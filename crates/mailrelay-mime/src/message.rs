//! Parsed view of a raw RFC 5322 message.

use crate::error::{Error, Result};
use crate::header::Headers;

/// A message split into its header fields and an uninterpreted body.
///
/// The body is kept as raw bytes; the relay forwards the original
/// payload and only reads headers for logging.
#[derive(Debug, Clone)]
pub struct Message {
    /// Message headers.
    pub headers: Headers,
    body: Vec<u8>,
}

impl Message {
    /// Parses a raw message.
    ///
    /// The header section ends at the first empty line and may be empty
    /// (a payload opening with a blank line has no fields). A payload
    /// without an empty line is treated as headers only.
    ///
    /// # Errors
    ///
    /// Returns an error if a header line is malformed, or if the payload
    /// ends without a single header field or section terminator.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let (header_section, body) = split_header_section(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(header_section))?;
        if headers.is_empty() && body.is_none() {
            return Err(Error::MissingHeaders);
        }

        Ok(Self {
            headers,
            body: body.unwrap_or_default().to_vec(),
        })
    }

    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("subject")
    }

    /// Gets the Subject header with RFC 2047 encoded-words decoded.
    ///
    /// Falls back to the raw value when it cannot be decoded.
    #[must_use]
    pub fn subject_decoded(&self) -> Option<String> {
        self.subject()
            .map(|raw| Headers::decode_value(raw).unwrap_or_else(|_| raw.to_string()))
    }

    /// Raw body bytes following the header section.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Splits `raw` at the first empty line. The body is `None` when there is
/// no empty line.
fn split_header_section(raw: &[u8]) -> (&[u8], Option<&[u8]>) {
    let mut pos = 0;
    while pos < raw.len() {
        let end = raw[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(raw.len(), |i| pos + i + 1);

        let line = &raw[pos..end];
        if line == b"\r\n" || line == b"\n" {
            return (&raw[..pos], Some(&raw[end..]));
        }
        pos = end;
    }
    (raw, None)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    const SIMPLE: &[u8] = b"From: user@example.com\r\n\
        To: recipient@destination.com\r\n\
        Subject: Test Email\r\n\
        Content-Type: text/plain\r\n\
        \r\n\
        This is a test email body.";

    #[test]
    fn test_parse_simple_message() {
        let message = Message::parse(SIMPLE).unwrap();
        assert_eq!(message.headers.get("from"), Some("user@example.com"));
        assert_eq!(message.headers.get("to"), Some("recipient@destination.com"));
        assert_eq!(message.subject(), Some("Test Email"));
        assert_eq!(message.body(), b"This is a test email body.");
        assert!(message.headers.get("message-id").is_none());
    }

    #[test]
    fn test_parse_lf_only() {
        let message = Message::parse(b"Subject: lf\n\nbody\n").unwrap();
        assert_eq!(message.subject(), Some("lf"));
        assert_eq!(message.body(), b"body\n");
    }

    #[test]
    fn test_parse_headers_only() {
        let message = Message::parse(b"Subject: no body").unwrap();
        assert_eq!(message.subject(), Some("no body"));
        assert!(message.body().is_empty());
    }

    #[test]
    fn test_body_keeps_blank_lines() {
        let message = Message::parse(b"Subject: x\r\n\r\nline1\r\n\r\nline2").unwrap();
        assert_eq!(message.body(), b"line1\r\n\r\nline2");
    }

    #[test]
    fn test_subject_decoded() {
        let message = Message::parse(b"Subject: =?utf-8?B?SMOpbGxv?=\r\n\r\n").unwrap();
        assert_eq!(message.subject_decoded().as_deref(), Some("Héllo"));
    }

    #[test]
    fn test_subject_decoded_falls_back_to_raw() {
        let message = Message::parse(b"Subject: =?utf-8?X?abc?=\r\n\r\n").unwrap();
        assert_eq!(message.subject_decoded().as_deref(), Some("=?utf-8?X?abc?="));
    }

    #[test]
    fn test_eight_bit_header_is_tolerated() {
        let message = Message::parse(b"Subject: caf\xc3\xa9\r\n\r\n").unwrap();
        assert_eq!(message.subject(), Some("café"));
    }

    #[test]
    fn test_parse_plain_text_fails() {
        let err = Message::parse(b"this is not an email").unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { .. }));
    }

    #[test]
    fn test_parse_empty_fails() {
        assert!(matches!(Message::parse(b""), Err(Error::MissingHeaders)));
    }

    #[test]
    fn test_parse_blank_first_line_has_empty_headers() {
        let message = Message::parse(b"\r\nbody only").unwrap();
        assert!(message.headers.is_empty());
        assert!(message.subject().is_none());
        assert_eq!(message.body(), b"body only");
    }

    #[test]
    fn test_parse_lone_blank_line() {
        let message = Message::parse(b"\n").unwrap();
        assert!(message.headers.is_empty());
        assert!(message.body().is_empty());
    }

    #[test]
    fn test_split_header_section() {
        let (head, body) = split_header_section(b"A: 1\r\nB: 2\r\n\r\nbody");
        assert_eq!(head, b"A: 1\r\nB: 2\r\n");
        assert_eq!(body, Some(&b"body"[..]));

        let (head, body) = split_header_section(b"A: 1");
        assert_eq!(head, b"A: 1");
        assert!(body.is_none());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_never_panics(raw in proptest::collection::vec(any::<u8>(), 0..512)) {
                let _ = Message::parse(&raw);
            }

            #[test]
            fn body_is_preserved(body in proptest::collection::vec(any::<u8>(), 0..256)) {
                let mut raw = b"Subject: p\r\n\r\n".to_vec();
                raw.extend_from_slice(&body);
                let message = Message::parse(&raw).unwrap();
                prop_assert_eq!(message.body(), body.as_slice());
            }
        }
    }
}
