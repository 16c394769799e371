//! HTTP client carrying a self-refreshing bearer credential.

use crate::error::Result;
use crate::flow::OAuthClient;
use crate::token::{Token, TokenStore};
use reqwest::RequestBuilder;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Authorized HTTP client handed out once credentials are ready.
///
/// Shared by reference for the life of the process. Before each request the
/// token is checked; an expired token is refreshed and the new token is
/// written back to the cache. Concurrent callers wait on one refresh.
pub struct AuthorizedClient {
    oauth: OAuthClient,
    token: Mutex<Token>,
    store: Option<TokenStore>,
}

impl AuthorizedClient {
    /// Wraps `token` issued for `oauth`.
    #[must_use]
    pub fn new(oauth: OAuthClient, token: Token) -> Self {
        Self {
            oauth,
            token: Mutex::new(token),
            store: None,
        }
    }

    /// Persists refreshed tokens to `store`.
    #[must_use]
    pub fn with_store(mut self, store: TokenStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Underlying HTTP client.
    #[must_use]
    pub const fn http(&self) -> &reqwest::Client {
        self.oauth.http_client()
    }

    /// Returns a token that is valid for at least another minute.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is expired and cannot be refreshed.
    pub async fn token(&self) -> Result<Token> {
        let mut token = self.token.lock().await;

        if token.is_expired() {
            info!("Access token expired, refreshing");
            let refreshed = self.oauth.refresh_token(&token).await?;

            if let Some(store) = &self.store {
                if let Err(e) = store.save(&refreshed).await {
                    warn!(path = %store.path().display(), error = %e, "Unable to save refreshed token");
                }
            }
            *token = refreshed;
        }

        Ok(token.clone())
    }

    /// Adds the `Authorization` header to `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if no valid token can be obtained.
    pub async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.token().await?;
        Ok(request.header(reqwest::header::AUTHORIZATION, token.authorization_header()))
    }
}

impl fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedClient")
            .field("client_id", &self.oauth.client_id)
            .field("provider", &self.oauth.provider.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::provider::Provider;
    use chrono::{Duration, Utc};

    fn oauth() -> OAuthClient {
        // Unroutable endpoints: any network use fails the test.
        let provider = Provider::new(
            "Test",
            "http://127.0.0.1:9/auth",
            "http://127.0.0.1:9/token",
        )
        .unwrap();
        OAuthClient::new("cid", provider)
    }

    #[tokio::test]
    async fn test_valid_token_is_used_as_is() {
        let token = Token::new("ya29.valid", "Bearer")
            .with_expires_at(Utc::now() + Duration::seconds(3600));
        let client = AuthorizedClient::new(oauth(), token.clone());

        assert_eq!(client.token().await.unwrap(), token);
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token() {
        let token = Token::new("ya29.old", "Bearer")
            .with_expires_at(Utc::now() - Duration::seconds(10));
        let client = AuthorizedClient::new(oauth(), token);

        assert!(matches!(client.token().await, Err(Error::NoRefreshToken)));
    }

    #[tokio::test]
    async fn test_authorize_sets_header() {
        let client = AuthorizedClient::new(oauth(), Token::new("ya29.valid", "Bearer"));
        let request = client
            .authorize(client.http().get("http://127.0.0.1:9/"))
            .await
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            request.headers()[reqwest::header::AUTHORIZATION],
            "Bearer ya29.valid"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let client = AuthorizedClient::new(oauth(), Token::new("ya29.secret", "Bearer"));
        let debug = format!("{client:?}");
        assert!(debug.contains("cid"));
        assert!(!debug.contains("ya29.secret"));
    }
}
