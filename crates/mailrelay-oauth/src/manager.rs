//! Startup credential resolution.
//!
//! ```text
//! LoadCached ──ok──────────────────────────────────────────────→ Ready
//!     │
//!     └─missing/undecodable→ AwaitingConsent → Exchanging → Persisting → Ready
//! ```

use crate::client::AuthorizedClient;
use crate::error::{Error, Result};
use crate::flow::{AuthorizationCodeFlow, CallbackServer, OAuthClient, generate_state};
use crate::token::{Token, TokenStore};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Resolves a usable token once at startup and produces the
/// [`AuthorizedClient`].
#[derive(Debug)]
pub struct CredentialManager {
    client: OAuthClient,
    store: TokenStore,
    callback_addr: SocketAddr,
    consent_timeout: Option<Duration>,
    open_browser: bool,
}

impl CredentialManager {
    /// Creates a manager caching tokens in `store`.
    ///
    /// Defaults: callback on an ephemeral loopback port, no consent
    /// timeout, browser opening enabled.
    #[must_use]
    pub fn new(client: OAuthClient, store: TokenStore) -> Self {
        Self {
            client,
            store,
            callback_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            consent_timeout: None,
            open_browser: true,
        }
    }

    /// Sets the callback listener address.
    #[must_use]
    pub const fn with_callback_addr(mut self, addr: SocketAddr) -> Self {
        self.callback_addr = addr;
        self
    }

    /// Bounds the wait for consent. `None` waits indefinitely.
    #[must_use]
    pub const fn with_consent_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.consent_timeout = timeout;
        self
    }

    /// Enables or disables opening the authorization URL in a browser.
    #[must_use]
    pub const fn with_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }

    /// Loads the cached token or runs the consent flow, then returns the
    /// authorized client.
    ///
    /// # Errors
    ///
    /// Any failure of the consent flow, the code exchange or persisting the
    /// new token is fatal and returned as is.
    pub async fn authorize(self) -> Result<AuthorizedClient> {
        let path = self.store.path().display().to_string();

        let token = match self.store.load().await {
            Ok(token) => {
                info!(%path, "Using cached token");
                token
            }
            Err(e) => {
                info!(%path, error = %e, "No usable cached token, requesting consent");
                let token = self.obtain_token().await?;
                info!(%path, "Saving token");
                self.store.save(&token).await?;
                token
            }
        };

        Ok(AuthorizedClient::new(self.client, token).with_store(self.store))
    }

    async fn obtain_token(&self) -> Result<Token> {
        let consent = self.begin_consent().await?;
        let url = consent.url();

        info!(%url, "Authorize this app by visiting the URL");
        if self.open_browser {
            if let Err(e) = opener::open(url.as_str()) {
                warn!(error = %e, "Unable to open a browser, open the URL manually");
            }
        }

        consent.complete(self.consent_timeout).await
    }

    /// Starts one consent round: binds the callback listener and prepares
    /// the authorization URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the callback address cannot be bound or the URL
    /// cannot be built.
    pub async fn begin_consent(&self) -> Result<PendingConsent> {
        let state = generate_state();
        let callback = CallbackServer::bind(self.callback_addr, state.clone()).await?;

        let client = self.client.clone().with_redirect_uri(callback.redirect_uri());
        let flow = AuthorizationCodeFlow::new(client, state).with_pkce();
        let url = flow.authorization_url(None)?;

        Ok(PendingConsent {
            flow,
            callback,
            url,
        })
    }
}

/// A consent round waiting for the browser redirect.
#[derive(Debug)]
pub struct PendingConsent {
    flow: AuthorizationCodeFlow,
    callback: CallbackServer,
    url: Url,
}

impl PendingConsent {
    /// URL the operator must open.
    #[must_use]
    pub fn url(&self) -> Url {
        self.url.clone()
    }

    /// Waits for the authorization code and exchanges it for a token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] when `timeout` elapses first, the callback
    /// error on a rejected redirect, or the token endpoint error.
    pub async fn complete(self, timeout: Option<Duration>) -> Result<Token> {
        let code = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.callback.wait_for_code())
                .await
                .map_err(|_| Error::Timeout(limit.as_secs()))??,
            None => self.callback.wait_for_code().await?,
        };

        debug!("Exchanging authorization code");
        self.flow.exchange_code(&code).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::provider::Provider;
    use chrono::{Duration as ChronoDuration, Utc};

    fn oauth() -> OAuthClient {
        let provider = Provider::new(
            "Test",
            "https://auth.example.com/authorize",
            "http://127.0.0.1:9/token",
        )
        .unwrap();
        OAuthClient::new("cid", provider)
    }

    #[tokio::test]
    async fn test_cached_token_skips_consent() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        let cached = Token::new("ya29.cached", "Bearer")
            .with_refresh_token("1//r")
            .with_expires_at(Utc::now() + ChronoDuration::seconds(3600));
        store.save(&cached).await.unwrap();

        let client = CredentialManager::new(oauth(), store)
            .with_browser(false)
            .with_consent_timeout(Some(Duration::from_millis(1)))
            .authorize()
            .await
            .unwrap();

        assert_eq!(client.token().await.unwrap(), cached);
    }

    #[tokio::test]
    async fn test_consent_url_points_back_to_callback() {
        let dir = tempfile::tempdir().unwrap();
        let manager =
            CredentialManager::new(oauth(), TokenStore::new(dir.path().join("token.json")));

        let consent = manager.begin_consent().await.unwrap();
        let url = consent.url();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(pairs["client_id"], "cid");
        assert!(pairs["redirect_uri"].starts_with("http://127.0.0.1:"));
        assert!(!pairs["state"].is_empty());
        assert_eq!(pairs["code_challenge_method"], "S256");
    }

    #[tokio::test]
    async fn test_consent_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));

        let result = CredentialManager::new(oauth(), store.clone())
            .with_browser(false)
            .with_consent_timeout(Some(Duration::from_millis(50)))
            .authorize()
            .await;

        assert!(matches!(result, Err(Error::Timeout(0))));
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn test_undecodable_cache_triggers_consent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "garbage").unwrap();

        let result = CredentialManager::new(oauth(), TokenStore::new(&path))
            .with_browser(false)
            .with_consent_timeout(Some(Duration::from_millis(50)))
            .authorize()
            .await;

        assert!(matches!(result, Err(Error::Timeout(_))));
    }
}
