//! Envelope address types.

use crate::error::{Error, Result};

/// Email address from an SMTP envelope path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Parses an angle-bracketed path such as `<user@example.com>`.
    ///
    /// Returns `None` for the null path `<>`. A source route
    /// (`<@relay.example:user@example.com>`) is accepted and discarded.
    /// Bare addresses without brackets are tolerated.
    ///
    /// # Errors
    ///
    /// Returns an error if the brackets are unbalanced or the address is
    /// invalid.
    pub fn parse_path(path: &str) -> Result<Option<Self>> {
        let path = path.trim();
        let inner = match (path.strip_prefix('<'), path.ends_with('>')) {
            (Some(rest), true) => &rest[..rest.len() - 1],
            (None, false) => path,
            _ => {
                return Err(Error::InvalidAddress(format!(
                    "Unbalanced angle brackets: {path}"
                )));
            }
        };

        if inner.is_empty() {
            return Ok(None);
        }

        let mailbox = if inner.starts_with('@') {
            inner
                .split_once(':')
                .map(|(_, mailbox)| mailbox)
                .ok_or_else(|| Error::InvalidAddress(format!("Bad source route: {inner}")))?
        } else {
            inner
        };

        Self::new(mailbox).map(Some)
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the address, returning the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Validates an email address (basic validation).
    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        if addr.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::InvalidAddress(
                "Address cannot contain whitespace".into(),
            ));
        }

        // Quoted local parts may contain '@', so split on the last one.
        let Some((local, domain)) = addr.rsplit_once('@') else {
            return Err(Error::InvalidAddress("Address must contain @".into()));
        };

        if local.is_empty() || domain.is_empty() {
            return Err(Error::InvalidAddress(
                "Local and domain parts cannot be empty".into(),
            ));
        }

        Ok(())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
