//! Per-message gatekeeper installed as the SMTP listener's handler.

use crate::filter::{DropReason, Filter};
use crate::forward::{Forwarder, SendApi, TransportError};
use mailrelay_mime::Message;
use mailrelay_smtp::{InboundMessage, MailHandler};
use tracing::{info, warn};

/// What happened to one accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Handed to the send API.
    Forwarded,
    /// Silently dropped; the client still sees a successful delivery.
    Dropped(DropReason),
}

/// Parses, filters and forwards each message.
///
/// Holds only immutable state and is shared by every connection task.
#[derive(Debug)]
pub struct MailIntake<A> {
    filter: Filter,
    forwarder: Forwarder<A>,
}

impl<A: SendApi> MailIntake<A> {
    /// Creates the intake.
    pub const fn new(filter: Filter, forwarder: Forwarder<A>) -> Self {
        Self { filter, forwarder }
    }

    /// Runs the gates in order: parse, sender, recipients, forward.
    ///
    /// # Errors
    ///
    /// Only a forwarding failure is an error; parse failures and filter
    /// rejections are reported as [`Outcome::Dropped`].
    pub async fn process(&self, message: &InboundMessage) -> Result<Outcome, TransportError> {
        let parsed = match Message::parse(&message.data) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(origin = %message.origin, error = %e, "Unable to decode message, discarding");
                return Ok(Outcome::Dropped(DropReason::Unparseable));
            }
        };

        let subject = parsed.subject_decoded().unwrap_or_default();
        info!(
            origin = %message.origin,
            from = %message.from,
            to = ?message.to,
            subject = %subject,
            "Received mail"
        );

        if let Err(reason) = self.filter.check(&message.from, &message.to) {
            match &reason {
                DropReason::Sender(from) => {
                    warn!(%from, "Ignoring email due to sender restrictions");
                }
                DropReason::Recipient(to) => {
                    warn!(%to, "Ignoring email due to recipient restrictions");
                }
                DropReason::Unparseable => {}
            }
            return Ok(Outcome::Dropped(reason));
        }

        match self.forwarder.send(&message.data).await {
            Ok(()) => {
                info!(to = ?message.to, "Message sent successfully");
                Ok(Outcome::Forwarded)
            }
            Err(e) => {
                warn!(to = ?message.to, error = %e, "Unable to send email");
                Err(e)
            }
        }
    }
}

impl<A: SendApi> MailHandler for MailIntake<A> {
    type Error = TransportError;

    async fn handle(&self, message: InboundMessage) -> Result<(), TransportError> {
        self.process(&message).await.map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::filter::PatternSet;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockApi {
        sent: Arc<Mutex<Vec<String>>>,
        should_fail: bool,
    }

    impl SendApi for MockApi {
        async fn send_raw(&self, raw: String) -> Result<(), TransportError> {
            if self.should_fail {
                return Err(TransportError::Api {
                    status: 400,
                    message: "Failure!!!".into(),
                });
            }
            self.sent.lock().unwrap().push(raw);
            Ok(())
        }
    }

    const RAW: &[u8] = b"From: user@example.com\r\n\
        To: recipient@destination.com\r\n\
        Subject: =?UTF-8?B?VGVzdCDinJM=?=\r\n\
        \r\n\
        This is a test email.\r\n";

    fn intake(api: MockApi) -> MailIntake<MockApi> {
        let filter = Filter::new(
            PatternSet::build(r".*@example\.com").unwrap(),
            PatternSet::build(r".*@destination\.com").unwrap(),
        );
        MailIntake::new(filter, Forwarder::new(api))
    }

    fn message(from: &str, to: &[&str], data: &[u8]) -> InboundMessage {
        InboundMessage {
            origin: "192.0.2.1:25".parse().unwrap(),
            from: from.to_string(),
            to: to.iter().map(ToString::to_string).collect(),
            data: data.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_allowed_message_is_forwarded_once() {
        let api = MockApi::default();
        let intake = intake(api.clone());

        let outcome = intake
            .process(&message("user@example.com", &["recipient@destination.com"], RAW))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Forwarded);
        let sent = api.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(STANDARD.decode(&sent[0]).unwrap(), RAW);
    }

    #[tokio::test]
    async fn test_one_disallowed_recipient_drops_message() {
        let api = MockApi::default();
        let intake = intake(api.clone());

        let outcome = intake
            .process(&message(
                "user@example.com",
                &["recipient@destination.com", "other@unknown.com"],
                RAW,
            ))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Dropped(DropReason::Recipient("other@unknown.com".into()))
        );
        assert!(api.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disallowed_sender_drops_message() {
        let api = MockApi::default();
        let intake = intake(api.clone());

        let outcome = intake
            .process(&message("spam@elsewhere.org", &["recipient@destination.com"], RAW))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Dropped(DropReason::Sender(_))));
        assert!(api.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let api = MockApi {
            should_fail: true,
            ..MockApi::default()
        };
        let intake = intake(api.clone());

        let result = intake
            .handle(message("user@example.com", &["recipient@destination.com"], RAW))
            .await;

        assert!(matches!(result, Err(TransportError::Api { status: 400, .. })));
        assert!(api.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped_without_error() {
        let api = MockApi::default();
        let intake = intake(api.clone());

        let result = intake
            .handle(message(
                "user@example.com",
                &["recipient@destination.com"],
                b"this is not a mail message",
            ))
            .await;

        assert!(result.is_ok());
        assert!(api.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_headerless_payload_is_forwarded() {
        let api = MockApi::default();
        let intake = MailIntake::new(Filter::default(), Forwarder::new(api.clone()));
        let raw = b"\r\nbody only\r\n";

        let outcome = intake
            .process(&message("user@example.com", &["recipient@destination.com"], raw))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Forwarded);
        let sent = api.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(STANDARD.decode(&sent[0]).unwrap(), raw);
    }

    #[tokio::test]
    async fn test_same_message_twice_is_forwarded_twice() {
        let api = MockApi::default();
        let intake = intake(api.clone());
        let msg = message("user@example.com", &["recipient@destination.com"], RAW);

        intake.handle(msg.clone()).await.unwrap();
        intake.handle(msg).await.unwrap();

        assert_eq!(api.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_allow_lists_forward_everything() {
        let api = MockApi::default();
        let intake = MailIntake::new(Filter::default(), Forwarder::new(api.clone()));

        intake
            .handle(message("", &["anyone@anywhere.test"], RAW))
            .await
            .unwrap();

        assert_eq!(api.sent.lock().unwrap().len(), 1);
    }
}
