//! Submission of accepted messages to the send API.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mailrelay_oauth::AuthorizedClient;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::debug;
use url::Url;

/// Failure to hand a message to the send API.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No usable access token.
    #[error("Credential error: {0}")]
    Credential(#[from] mailrelay_oauth::Error),

    /// Request could not be sent or the response could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Send API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },
}

/// "Submit raw message for the authenticated account."
pub trait SendApi: Send + Sync + 'static {
    /// Submits a base64 (standard alphabet) encoded RFC 5322 message.
    fn send_raw(&self, raw: String) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Encodes whole messages and submits them through a [`SendApi`].
///
/// No retry is attempted.
#[derive(Debug, Clone)]
pub struct Forwarder<A> {
    api: A,
}

impl<A: SendApi> Forwarder<A> {
    /// Wraps a send API.
    pub const fn new(api: A) -> Self {
        Self { api }
    }

    /// Sends `raw`, headers included.
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged.
    pub async fn send(&self, raw: &[u8]) -> Result<(), TransportError> {
        self.api.send_raw(STANDARD.encode(raw)).await
    }
}

/// Gmail `users.messages.send`, always for the `me` mailbox.
#[derive(Debug)]
pub struct GmailApi {
    client: AuthorizedClient,
    endpoint: Url,
}

#[derive(Serialize)]
struct SendRequest {
    raw: String,
}

#[derive(Deserialize)]
struct SentMessage {
    id: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

impl GmailApi {
    /// Default API root.
    pub const DEFAULT_BASE_URL: &'static str = "https://gmail.googleapis.com";

    /// Creates the API for `client`, rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` cannot be a base.
    pub fn new(client: AuthorizedClient, base_url: &Url) -> Result<Self, url::ParseError> {
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join("gmail/v1/users/me/messages/send")?;
        Ok(Self { client, endpoint })
    }

    /// Send endpoint URL.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl SendApi for GmailApi {
    async fn send_raw(&self, raw: String) -> Result<(), TransportError> {
        let request = self
            .client
            .http()
            .post(self.endpoint.clone())
            .json(&SendRequest { raw });
        let response = self.client.authorize(request).await?.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map_or(body, |parsed| parsed.error.message);
            return Err(TransportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let id = response
            .json::<SentMessage>()
            .await
            .ok()
            .and_then(|sent| sent.id);
        debug!(id = id.as_deref().unwrap_or("-"), "Send API accepted message");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<String>>,
    }

    impl SendApi for Recording {
        async fn send_raw(&self, raw: String) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(raw);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_forwarder_encodes_whole_message() {
        let forwarder = Forwarder::new(Recording::default());
        let raw = b"Subject: Test\r\n\r\n\xff binary body\r\n";
        forwarder.send(raw).await.unwrap();

        let sent = forwarder.api.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(STANDARD.decode(&sent[0]).unwrap(), raw);
    }

    #[test]
    fn test_endpoint_join() {
        use mailrelay_oauth::{OAuthClient, Provider, Token};

        let client = || {
            AuthorizedClient::new(
                OAuthClient::new("cid", Provider::google().unwrap()),
                Token::new("a", "Bearer"),
            )
        };

        let api = GmailApi::new(client(), &Url::parse(GmailApi::DEFAULT_BASE_URL).unwrap()).unwrap();
        assert_eq!(
            api.endpoint().as_str(),
            "https://gmail.googleapis.com/gmail/v1/users/me/messages/send"
        );

        let api = GmailApi::new(client(), &Url::parse("http://127.0.0.1:8080/proxy").unwrap()).unwrap();
        assert_eq!(
            api.endpoint().as_str(),
            "http://127.0.0.1:8080/proxy/gmail/v1/users/me/messages/send"
        );
    }
}
