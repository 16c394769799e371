//! Sender and recipient allow-lists.

mod patterns;

pub use patterns::PatternSet;

/// Why a message was not forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The payload has no valid header section.
    Unparseable,
    /// The envelope sender is not allowed.
    Sender(String),
    /// This envelope recipient is not allowed.
    Recipient(String),
}

/// The pair of allow-lists applied to every envelope.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    senders: PatternSet,
    recipients: PatternSet,
}

impl Filter {
    /// Creates a filter from the sender and recipient allow-lists.
    #[must_use]
    pub const fn new(senders: PatternSet, recipients: PatternSet) -> Self {
        Self {
            senders,
            recipients,
        }
    }

    /// Checks the sender, then every recipient.
    ///
    /// The first recipient that is not allowed rejects the whole envelope.
    ///
    /// # Errors
    ///
    /// Returns the reason for the first failing check.
    pub fn check(&self, from: &str, to: &[String]) -> Result<(), DropReason> {
        if !self.senders.matches(from) {
            return Err(DropReason::Sender(from.to_string()));
        }
        match to.iter().find(|target| !self.recipients.matches(target)) {
            Some(target) => Err(DropReason::Recipient(target.clone())),
            None => Ok(()),
        }
    }

    /// Sender allow-list.
    #[must_use]
    pub const fn senders(&self) -> &PatternSet {
        &self.senders
    }

    /// Recipient allow-list.
    #[must_use]
    pub const fn recipients(&self) -> &PatternSet {
        &self.recipients
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filter() -> Filter {
        Filter::new(
            PatternSet::build(r".*@example\.com").unwrap(),
            PatternSet::build(r".*@destination\.com").unwrap(),
        )
    }

    #[test]
    fn test_allowed() {
        let to = vec!["recipient@destination.com".to_string()];
        assert_eq!(filter().check("user@example.com", &to), Ok(()));
    }

    #[test]
    fn test_sender_rejected() {
        let to = vec!["recipient@destination.com".to_string()];
        assert_eq!(
            filter().check("user@other.com", &to),
            Err(DropReason::Sender("user@other.com".into()))
        );
    }

    #[test]
    fn test_one_bad_recipient_rejects_all() {
        let to = vec![
            "recipient@destination.com".to_string(),
            "other@unknown.com".to_string(),
            "third@destination.com".to_string(),
        ];
        assert_eq!(
            filter().check("user@example.com", &to),
            Err(DropReason::Recipient("other@unknown.com".into()))
        );
    }

    #[test]
    fn test_default_allows_everything() {
        let to = vec!["anyone@anywhere".to_string()];
        assert_eq!(Filter::default().check("", &to), Ok(()));
    }
}
