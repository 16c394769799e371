//! Header section handling.

use crate::encoding::decode_rfc2047;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Collection of message header fields.
///
/// Field names are case-insensitive; repeated fields keep every value in
/// arrival order.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        let value = value.into();
        self.headers.entry(name).or_default().push(value);
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }

    /// Number of distinct field names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if no field was parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Parses a header section.
    ///
    /// `text` is everything before the blank line separating headers
    /// from the body. Lines may end in `\r\n` or `\n`:
    /// ```text
    /// Header-Name: value
    ///   folded continuation
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if a line is neither a `name: value` field nor a
    /// continuation, or if the section opens with a continuation line. An
    /// empty section yields empty headers.
    pub fn parse(text: &str) -> Result<Self> {
        let mut headers = Self::new();
        let mut current_name: Option<String> = None;
        let mut current_value = String::new();

        for (index, raw_line) in text.split('\n').enumerate() {
            let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
            if line.is_empty() {
                continue;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if current_name.is_none() {
                    return Err(Error::LeadingContinuation);
                }
                current_value.push(' ');
                current_value.push_str(line.trim());
                continue;
            }

            if let Some(name) = current_name.take() {
                headers.add(name, current_value.trim().to_string());
                current_value.clear();
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(Error::MalformedHeader {
                    line: index + 1,
                    content: line.to_string(),
                });
            };

            if !is_field_name(name) {
                return Err(Error::MalformedHeader {
                    line: index + 1,
                    content: line.to_string(),
                });
            }

            current_name = Some(name.to_string());
            current_value = value.trim().to_string();
        }

        if let Some(name) = current_name {
            headers.add(name, current_value.trim().to_string());
        }

        Ok(headers)
    }

    /// Decodes a header value from RFC 2047 if encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_value(value: &str) -> Result<String> {
        decode_rfc2047(value)
    }
}

/// RFC 5322 `field-name`: one or more printable US-ASCII characters
/// other than colon.
fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| (33..=126).contains(&b) && b != b':')
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

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.headers.is_empty());
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_repeated_fields() {
        let mut headers = Headers::new();
        headers.add("Received", "from a");
        headers.add("Received", "from b");
        assert_eq!(headers.get("Received"), Some("from a"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_parse_crlf() {
        let text = "From: a@example.com\r\nSubject: Hi\r\n";
        let headers = Headers::parse(text).unwrap();
        assert_eq!(headers.get("from"), Some("a@example.com"));
        assert_eq!(headers.get("subject"), Some("Hi"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_parse_folded_value() {
        let text = "Subject: a very\r\n  long subject\r\nTo: b@example.com";
        let headers = Headers::parse(text).unwrap();
        assert_eq!(headers.get("subject"), Some("a very long subject"));
        assert_eq!(headers.get("to"), Some("b@example.com"));
    }

    #[test]
    fn test_parse_empty_value() {
        let headers = Headers::parse("Subject:\n").unwrap();
        assert_eq!(headers.get("subject"), Some(""));
    }

    #[test]
    fn test_parse_rejects_line_without_colon() {
        let err = Headers::parse("From: a@example.com\nnot a header\n").unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { line: 2, .. }));
    }

    #[test]
    fn test_parse_rejects_space_in_name() {
        let err = Headers::parse("Bad Name: value\n").unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { line: 1, .. }));
    }

    #[test]
    fn test_parse_rejects_leading_continuation() {
        let err = Headers::parse("  folded\nSubject: x\n").unwrap_err();
        assert!(matches!(err, Error::LeadingContinuation));
    }

    #[test]
    fn test_parse_empty_section() {
        assert!(Headers::parse("").unwrap().is_empty());
        assert!(Headers::parse("\r\n").unwrap().is_empty());
    }

    #[test]
    fn test_field_name() {
        assert!(is_field_name("X-Custom-Header"));
        assert!(!is_field_name(""));
        assert!(!is_field_name("With Space"));
        assert!(!is_field_name("Tab\tName"));
    }
}
