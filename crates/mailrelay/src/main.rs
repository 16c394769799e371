//! `mailrelay` - SMTP sidecar that forwards allowed mail through the Gmail API
//!
//! Applications on the local network hand mail to this listener as if it
//! were an ordinary SMTP server; the relay forwards it on behalf of one
//! Google account authorized through an `OAuth2` consent flow.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use mailrelay_core::config::{DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_SMTP_HOSTNAME, DEFAULT_SMTP_LISTEN};
use mailrelay_core::{Config, GmailApi, PatternSet, parse_listen_addr};

/// Command line and environment settings.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SMTP listen address (`ip:port` or `:port`)
    #[arg(long, env = "SMTP_LISTEN", default_value = DEFAULT_SMTP_LISTEN, value_parser = parse_addr)]
    smtp_listen: SocketAddr,

    /// Hostname announced in the SMTP greeting
    #[arg(long, env = "SMTP_HOSTNAME", default_value = DEFAULT_SMTP_HOSTNAME)]
    smtp_hostname: String,

    /// Largest accepted message in bytes
    #[arg(long, env = "SMTP_MAX_MESSAGE_SIZE", default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    max_message_size: usize,

    /// OAuth client secret file
    #[arg(long, env = "CREDENTIALS_JSON", default_value = "credentials.json")]
    credentials: PathBuf,

    /// Token cache file
    #[arg(long, env = "TOKEN_JSON", default_value = "token.json")]
    token: PathBuf,

    /// Comma-separated sender patterns; empty allows every sender
    #[arg(long, env = "ALLOWED_SENDERS", default_value = "")]
    allowed_senders: String,

    /// Comma-separated recipient patterns; empty allows every recipient
    #[arg(long, env = "ALLOWED_RECIPIENTS", default_value = "")]
    allowed_recipients: String,

    /// Listen address for the OAuth consent callback
    #[arg(long, env = "OAUTH_CALLBACK_LISTEN", default_value = "127.0.0.1:0", value_parser = parse_addr)]
    callback_listen: SocketAddr,

    /// Seconds to wait for consent; waits indefinitely if unset
    #[arg(long, env = "OAUTH_CONSENT_TIMEOUT")]
    consent_timeout: Option<u64>,

    /// Print the consent URL without opening a browser
    #[arg(long, env = "OAUTH_NO_BROWSER")]
    no_browser: bool,

    /// Gmail API root
    #[arg(long, env = "GMAIL_API_URL", default_value = GmailApi::DEFAULT_BASE_URL)]
    gmail_api_url: Url,
}

fn parse_addr(value: &str) -> std::result::Result<SocketAddr, String> {
    parse_listen_addr(value).map_err(|e| e.to_string())
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let config = Config {
            smtp_listen: self.smtp_listen,
            smtp_hostname: self.smtp_hostname,
            max_message_size: self.max_message_size,
            credentials: self.credentials,
            token: self.token,
            allowed_senders: PatternSet::build(&self.allowed_senders)
                .context("invalid ALLOWED_SENDERS")?,
            allowed_recipients: PatternSet::build(&self.allowed_recipients)
                .context("invalid ALLOWED_RECIPIENTS")?,
            callback_listen: self.callback_listen,
            consent_timeout: self.consent_timeout.map(Duration::from_secs),
            open_browser: !self.no_browser,
            gmail_api_url: self.gmail_api_url.into(),
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mailrelay=info,mailrelay_core=info,mailrelay_smtp=info,mailrelay_oauth=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Cli::parse().into_config()?;
    info!(
        smtp = %config.smtp_listen,
        hostname = %config.smtp_hostname,
        "Starting mailrelay"
    );

    mailrelay_core::run(&config, shutdown_signal())
        .await
        .context("relay stopped")?;

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Unable to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "mailrelay",
            "--smtp-listen",
            ":2526",
            "--smtp-hostname",
            "relay.internal",
            "--allowed-senders",
            r".*@example\.com, .*@corp\.example",
            "--allowed-recipients",
            r".*@destination\.com",
            "--consent-timeout",
            "300",
            "--no-browser",
            "--gmail-api-url",
            "http://127.0.0.1:8080",
        ])
        .unwrap();

        let config = cli.into_config().unwrap();
        assert_eq!(config.smtp_listen, "0.0.0.0:2526".parse().unwrap());
        assert_eq!(config.smtp_hostname, "relay.internal");
        assert_eq!(config.allowed_senders.len(), 2);
        assert!(config.allowed_recipients.matches("someone@destination.com"));
        assert_eq!(config.consent_timeout, Some(Duration::from_secs(300)));
        assert!(!config.open_browser);
        assert_eq!(config.gmail_api_url.as_str(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let cli =
            Cli::try_parse_from(["mailrelay", "--allowed-recipients", "[unclosed"]).unwrap();
        let err = cli.into_config().unwrap_err();
        assert!(err.to_string().contains("ALLOWED_RECIPIENTS"));
    }

    #[test]
    fn test_invalid_listen_address_is_rejected() {
        assert!(Cli::try_parse_from(["mailrelay", "--smtp-listen", "localhost"]).is_err());
    }
}
