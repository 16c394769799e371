//! Startup sequence: obtain credentials, then accept mail until shutdown.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::forward::{Forwarder, GmailApi, SendApi};
use crate::intake::MailIntake;
use mailrelay_oauth::{ClientSecret, CredentialManager, TokenStore};
use mailrelay_smtp::Server;
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

/// Runs the relay.
///
/// Credentials are obtained before the SMTP port is opened, so a client
/// that connects early is refused rather than left waiting on consent.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, credentials cannot be
/// obtained, or the SMTP listener cannot be bound.
pub async fn run<F>(config: &Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    config.validate()?;

    let secret = ClientSecret::from_file(&config.credentials).await?;
    let client = CredentialManager::new(secret.into_client()?, TokenStore::new(&config.token))
        .with_callback_addr(config.callback_listen)
        .with_consent_timeout(config.consent_timeout)
        .with_browser(config.open_browser)
        .authorize()
        .await?;

    let api = GmailApi::new(client, &config.gmail_api_url()?)
        .map_err(|e| Error::Config(format!("invalid Gmail API URL: {e}")))?;

    let listener = TcpListener::bind(config.smtp_listen).await?;
    serve(config, api, listener, shutdown).await
}

/// Accepts mail on `listener` and forwards it through `api`.
///
/// # Errors
///
/// Returns an error if accepting connections fails.
pub async fn serve<A, F>(config: &Config, api: A, listener: TcpListener, shutdown: F) -> Result<()>
where
    A: SendApi,
    F: Future<Output = ()> + Send,
{
    let intake = MailIntake::new(config.filter(), Forwarder::new(api));
    info!(
        addr = %listener.local_addr()?,
        senders = %config.allowed_senders,
        recipients = %config.allowed_recipients,
        "Handler is ready"
    );

    Server::new(config.server_config(), intake)
        .serve_with_shutdown(listener, shutdown)
        .await?;
    Ok(())
}
