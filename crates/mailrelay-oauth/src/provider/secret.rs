//! Google-style client secret files (`credentials.json`).

use super::{GMAIL_SEND_SCOPE, Provider};
use crate::error::{Error, Result};
use crate::flow::OAuthClient;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Client registration read from a client secret file.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    /// Client ID.
    pub client_id: String,
    /// Client secret, absent for some public clients.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Authorization endpoint.
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Top-level layout: the registration sits under `installed` or `web`.
#[derive(Deserialize)]
struct SecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ClientSecret {
    /// Parses the JSON content of a client secret file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the JSON is malformed or holds
    /// neither an `installed` nor a `web` section.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SecretFile = serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfig(format!("malformed client secret: {e}")))?;

        let secret = file.installed.or(file.web).ok_or_else(|| {
            Error::InvalidConfig("client secret has no `installed` or `web` section".into())
        })?;

        if secret.client_id.is_empty() {
            return Err(Error::InvalidConfig("client secret has an empty client_id".into()));
        }
        Ok(secret)
    }

    /// Reads and parses a client secret file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the file cannot be read or parsed.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::InvalidConfig(format!(
                "unable to read client secret file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }

    /// Builds the provider described by this registration, requesting the
    /// send-only Gmail scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoints are not valid URLs.
    pub fn provider(&self) -> Result<Provider> {
        let provider = Provider::new("Custom", &self.auth_uri, &self.token_uri)?;
        let name = match provider.auth_url.host_str() {
            Some(host) if host == "google.com" || host.ends_with(".google.com") => "Google",
            _ => "Custom",
        };
        let provider = Provider {
            name: name.to_string(),
            ..provider
        }
        .with_default_scopes(vec![GMAIL_SEND_SCOPE.to_string()]);
        provider.validate()?;
        Ok(provider)
    }

    /// Converts the registration into an OAuth client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoints are invalid.
    pub fn into_client(self) -> Result<OAuthClient> {
        let provider = self.provider()?;
        let client = OAuthClient::new(self.client_id, provider);
        Ok(match self.client_secret {
            Some(secret) => client.with_client_secret(secret),
            None => client,
        })
    }
}
