//! # mailrelay-oauth
//!
//! `OAuth2` credential lifecycle for the mail relay.
//!
//! ## Features
//!
//! - **Authorization Code Flow** with PKCE and a short-lived local callback
//!   listener
//! - **Token cache**: JSON file, owner-only permissions, reused across restarts
//! - **Refresh**: expired tokens are refreshed before use and written back
//! - **Client secret files**: Google-style `credentials.json`
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailrelay_oauth::{ClientSecret, CredentialManager, TokenStore};
//!
//! #[tokio::main]
//! async fn main() -> mailrelay_oauth::Result<()> {
//!     let client = ClientSecret::from_file("credentials.json").await?.into_client()?;
//!     let authorized = CredentialManager::new(client, TokenStore::new("token.json"))
//!         .authorize()
//!         .await?;
//!
//!     let request = authorized
//!         .authorize(authorized.http().get("https://gmail.googleapis.com/gmail/v1/users/me/profile"))
//!         .await?;
//!     println!("{}", request.send().await?.text().await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Consent Round
//!
//! 1. A random `state` nonce is generated and a listener bound on loopback.
//! 2. The authorization URL is logged (and opened in a browser if enabled).
//! 3. The provider redirects to the listener with `state` and `code`.
//! 4. The code is exchanged for a token, which is cached on disk.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod flow;
mod manager;
pub mod provider;
pub mod token;

pub use client::AuthorizedClient;
pub use error::{Error, Result};
pub use flow::{AuthorizationCodeFlow, CallbackServer, OAuthClient, PkceChallenge};
pub use manager::{CredentialManager, PendingConsent};
pub use provider::{ClientSecret, GMAIL_SEND_SCOPE, Provider};
pub use token::{Token, TokenStore};
