//! Relay configuration, built once at startup and passed by reference.

use crate::error::{Error, Result};
use crate::filter::{Filter, PatternSet};
use crate::forward::GmailApi;
use mailrelay_smtp::ServerConfig;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default SMTP listen address.
pub const DEFAULT_SMTP_LISTEN: &str = "0.0.0.0:2525";

/// Default hostname announced to SMTP clients.
pub const DEFAULT_SMTP_HOSTNAME: &str = "smtp-sidecar";

/// Default message size limit (35 MiB, the Gmail API upload ceiling).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 35 * 1024 * 1024;

/// Everything the relay needs to run.
#[derive(Debug, Clone)]
pub struct Config {
    /// SMTP listen address.
    pub smtp_listen: SocketAddr,
    /// Hostname in the SMTP greeting.
    pub smtp_hostname: String,
    /// Largest accepted message in bytes.
    pub max_message_size: usize,
    /// Client secret file.
    pub credentials: PathBuf,
    /// Token cache file.
    pub token: PathBuf,
    /// Sender allow-list.
    pub allowed_senders: PatternSet,
    /// Recipient allow-list.
    pub allowed_recipients: PatternSet,
    /// Address of the OAuth callback listener.
    pub callback_listen: SocketAddr,
    /// Limit on waiting for consent; `None` waits indefinitely.
    pub consent_timeout: Option<Duration>,
    /// Whether to open the consent URL in a browser.
    pub open_browser: bool,
    /// Gmail API root; checked by [`Config::gmail_api_url`].
    pub gmail_api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smtp_listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 2525)),
            smtp_hostname: DEFAULT_SMTP_HOSTNAME.to_string(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            credentials: PathBuf::from("credentials.json"),
            token: PathBuf::from("token.json"),
            allowed_senders: PatternSet::default(),
            allowed_recipients: PatternSet::default(),
            callback_listen: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            consent_timeout: None,
            open_browser: true,
            gmail_api_url: GmailApi::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Checks values that parse but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.smtp_hostname.trim().is_empty() {
            return Err(Error::Config("SMTP hostname must not be empty".into()));
        }
        if self.max_message_size == 0 {
            return Err(Error::Config("maximum message size must be positive".into()));
        }
        self.gmail_api_url()?;
        Ok(())
    }

    /// The Gmail API root as a URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the value does not parse or is not
    /// http(s).
    pub fn gmail_api_url(&self) -> Result<Url> {
        let url = Url::parse(&self.gmail_api_url).map_err(|e| {
            Error::Config(format!("invalid Gmail API URL {}: {e}", self.gmail_api_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Gmail API URL must be http(s): {url}"
            )));
        }
        Ok(url)
    }

    /// The allow-lists as a [`Filter`].
    #[must_use]
    pub fn filter(&self) -> Filter {
        Filter::new(self.allowed_senders.clone(), self.allowed_recipients.clone())
    }

    /// Settings for the SMTP listener.
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(&self.smtp_hostname).with_max_message_size(self.max_message_size)
    }
}

/// Parses a listen address, accepting the `:port` shorthand for all
/// interfaces.
///
/// # Errors
///
/// Returns [`Error::Config`] if the address is not `ip:port` or `:port`.
pub fn parse_listen_addr(value: &str) -> Result<SocketAddr> {
    let value = value.trim();
    let parsed = match value.strip_prefix(':') {
        Some(port) => port
            .parse::<u16>()
            .map(|port| SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
            .ok(),
        None => value.parse().ok(),
    };
    parsed.ok_or_else(|| Error::Config(format!("invalid listen address: {value:?}")))
}
