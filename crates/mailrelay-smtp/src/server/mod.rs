//! SMTP listener: per-connection sessions and the accept loop.

mod listener;
mod session;

pub use listener::Server;
pub use session::Session;

use crate::types::Extension;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Hostname announced in the greeting and EHLO reply.
    pub hostname: String,
    /// Largest accepted message in bytes.
    pub max_message_size: usize,
    /// Largest number of `RCPT TO` per transaction.
    pub max_recipients: usize,
    /// How long a client may stay silent before the session is closed.
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            max_message_size: 35 * 1024 * 1024,
            max_recipients: 100,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration with the given hostname and default limits.
    #[must_use]
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Self::default()
        }
    }

    /// Sets the message size limit.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Sets the idle timeout.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Extensions advertised in the EHLO reply.
    #[must_use]
    pub const fn extensions(&self) -> [Extension; 3] {
        [
            Extension::Size(self.max_message_size),
            Extension::EightBitMime,
            Extension::Pipelining,
        ]
    }
}

/// A message accepted by the listener, handed to the [`MailHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Network address of the SMTP client.
    pub origin: SocketAddr,
    /// Envelope sender; empty for the null reverse path.
    pub from: String,
    /// Envelope recipients in `RCPT TO` order.
    pub to: Vec<String>,
    /// Raw message bytes after dot-unstuffing.
    pub data: Vec<u8>,
}

/// Callback invoked once per completed `DATA` transaction.
///
/// Implementations are shared by every connection task, so they must be
/// safe to call concurrently.
pub trait MailHandler: Send + Sync + 'static {
    /// Failure reported to the client as a transient rejection.
    type Error: fmt::Display + Send;

    /// Handles one message. `Ok` is reported as delivered, `Err` as
    /// `451`.
    fn handle(
        &self,
        message: InboundMessage,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
