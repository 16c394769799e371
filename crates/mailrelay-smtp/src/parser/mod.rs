//! SMTP command-line parser.

use crate::error::{Error, Result};
use crate::types::Address;

/// Splits a command line into its upper-cased verb and the remainder.
///
/// Trailing CRLF is removed and the remainder is trimmed.
#[must_use]
pub fn split_verb(line: &str) -> (String, &str) {
    let line = line.trim_end_matches(['\r', '\n']);
    let line = line.trim_start();
    match line.split_once(' ') {
        Some((verb, rest)) => (verb.to_ascii_uppercase(), rest.trim()),
        None => (line.to_ascii_uppercase(), ""),
    }
}

/// Parses the arguments of `MAIL FROM:<path> [params]`.
///
/// `args` is everything after the verb, beginning with `FROM:`.
///
/// # Errors
///
/// Returns an error if the `FROM:` keyword, the path, or a parameter is
/// malformed.
pub fn parse_mail_from(args: &str) -> Result<(Option<Address>, Vec<(String, Option<String>)>)> {
    let rest = strip_keyword(args, "FROM:")?;
    let (path, params) = split_path(rest)?;
    let from = Address::parse_path(path)?;
    Ok((from, parse_params(params)?))
}

/// Parses the arguments of `RCPT TO:<path> [params]`.
///
/// # Errors
///
/// Returns an error if the keyword or path is malformed, or if the path is
/// the null path.
pub fn parse_rcpt_to(args: &str) -> Result<Address> {
    let rest = strip_keyword(args, "TO:")?;
    let (path, params) = split_path(rest)?;
    parse_params(params)?;
    Address::parse_path(path)?
        .ok_or_else(|| Error::InvalidAddress("Recipient cannot be the null path".into()))
}

/// Parses ESMTP `KEY[=VALUE]` parameters separated by spaces.
///
/// Keys are upper-cased.
///
/// # Errors
///
/// Returns an error on an empty key.
pub fn parse_params(params: &str) -> Result<Vec<(String, Option<String>)>> {
    params
        .split_whitespace()
        .map(|param| {
            let (key, value) = match param.split_once('=') {
                Some((key, value)) => (key, Some(value.to_string())),
                None => (param, None),
            };
            if key.is_empty() {
                return Err(Error::syntax(format!("Bad parameter: {param}")));
            }
            Ok((key.to_ascii_uppercase(), value))
        })
        .collect()
}

/// Strips a case-insensitive keyword such as `FROM:`, tolerating a space
/// before the path.
fn strip_keyword<'a>(args: &'a str, keyword: &str) -> Result<&'a str> {
    let head = args.get(..keyword.len()).unwrap_or_default();
    if !head.eq_ignore_ascii_case(keyword) {
        return Err(Error::syntax(format!("Expected {keyword}")));
    }
    Ok(args[keyword.len()..].trim_start())
}

/// Splits `<path> params` at the closing bracket.
fn split_path(rest: &str) -> Result<(&str, &str)> {
    if rest.is_empty() {
        return Err(Error::syntax("Missing path"));
    }

    if rest.starts_with('<') {
        let end = rest
            .find('>')
            .ok_or_else(|| Error::syntax("Unterminated path"))?;
        return Ok((&rest[..=end], rest[end + 1..].trim()));
    }

    Ok(rest
        .split_once(' ')
        .map_or((rest, ""), |(path, params)| (path, params.trim())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_split_verb() {
        assert_eq!(split_verb("helo client.local\r\n"), ("HELO".to_string(), "client.local"));
        assert_eq!(split_verb("DATA\r\n"), ("DATA".to_string(), ""));
        assert_eq!(split_verb("  noop  \n"), ("NOOP".to_string(), ""));
    }

    #[test]
    fn test_parse_mail_from() {
        let (from, params) = parse_mail_from("FROM:<user@example.com>").unwrap();
        assert_eq!(from.unwrap().as_str(), "user@example.com");
        assert!(params.is_empty());
    }

    #[test]
    fn test_parse_mail_from_with_params() {
        let (from, params) =
            parse_mail_from("from:<user@example.com> SIZE=1024 body=8BITMIME").unwrap();
        assert_eq!(from.unwrap().as_str(), "user@example.com");
        assert_eq!(
            params,
            vec![
                ("SIZE".to_string(), Some("1024".to_string())),
                ("BODY".to_string(), Some("8BITMIME".to_string())),
            ]
        );
    }

    #[test]
    fn test_parse_mail_from_space_after_colon() {
        let (from, _) = parse_mail_from("FROM: <user@example.com>").unwrap();
        assert_eq!(from.unwrap().as_str(), "user@example.com");
    }

    #[test]
    fn test_parse_mail_from_null_path() {
        let (from, _) = parse_mail_from("FROM:<>").unwrap();
        assert!(from.is_none());
    }

    #[test]
    fn test_parse_mail_from_missing_keyword() {
        assert!(matches!(
            parse_mail_from("<user@example.com>"),
            Err(Error::Syntax(_))
        ));
    }

    #[test]
    fn test_parse_rcpt_to() {
        let to = parse_rcpt_to("TO:<recipient@destination.com>").unwrap();
        assert_eq!(to.as_str(), "recipient@destination.com");
    }

    #[test]
    fn test_parse_rcpt_to_null_path_rejected() {
        assert!(matches!(parse_rcpt_to("TO:<>"), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_parse_rcpt_to_unterminated() {
        assert!(matches!(
            parse_rcpt_to("TO:<recipient@destination.com"),
            Err(Error::Syntax(_))
        ));
    }

    #[test]
    fn test_parse_params_flag() {
        let params = parse_params("SMTPUTF8").unwrap();
        assert_eq!(params, vec![("SMTPUTF8".to_string(), None)]);
        assert!(parse_params("=x").is_err());
    }
}
