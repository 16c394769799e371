//! Comma-separated regular-expression allow-lists.

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Ordered set of compiled patterns with allow-list semantics.
///
/// An empty set allows everything. Patterns are unanchored and
/// case-sensitive unless they say otherwise (`^...$`, `(?i)`).
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compiles `list`, a comma-separated list of patterns.
    ///
    /// Segments are trimmed; blank segments are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for the first segment that does
    /// not compile; no partial set is returned.
    pub fn build(list: &str) -> Result<Self> {
        let patterns = list
            .split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                Regex::new(segment).map_err(|source| Error::InvalidPattern {
                    pattern: segment.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// True if the set is empty or any pattern matches somewhere in `value`.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|re| re.is_match(value))
    }

    /// Number of compiled patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True if no pattern was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Source text of each pattern, in input order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }
}

impl FromStr for PatternSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::build(s)
    }
}

impl fmt::Display for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("*");
        }
        for (i, source) in self.sources().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(source)?;
        }
        Ok(())
    }
}
