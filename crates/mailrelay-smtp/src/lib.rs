//! # mailrelay-smtp
//!
//! A small RFC 5321 SMTP listener. Each completed `DATA` transaction is
//! handed to a [`MailHandler`]; the handler's result decides the reply.
//!
//! ## Features
//!
//! - **Per-connection tasks**: one tokio task per accepted client
//! - **Commands**: HELO, EHLO, MAIL FROM, RCPT TO, DATA, RSET, NOOP, VRFY, QUIT
//! - **Extensions**: SIZE, 8BITMIME, PIPELINING
//! - **No relay auth**: STARTTLS and AUTH are answered `502`
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailrelay_smtp::{InboundMessage, MailHandler, Server, ServerConfig};
//! use tokio::net::TcpListener;
//!
//! struct Print;
//!
//! impl MailHandler for Print {
//!     type Error = std::convert::Infallible;
//!
//!     async fn handle(&self, message: InboundMessage) -> Result<(), Self::Error> {
//!         println!("{} -> {:?}: {} bytes", message.from, message.to, message.data.len());
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> mailrelay_smtp::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:2525").await?;
//!     Server::new(ServerConfig::new("relay.local"), Print)
//!         .serve(listener)
//!         .await
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! connected ── HELO/EHLO ──→ greeted ── MAIL ──→ sender set ── RCPT ──→ recipients
//!                               ↑                                           │
//!                               └──────── 250 / 451 / 552 ←── DATA ─────────┘
//! ```
//!
//! ## Modules
//!
//! - [`command`]: Command parsing
//! - [`parser`]: Argument and path parsing
//! - [`server`]: Sessions and the accept loop
//! - [`types`]: Core SMTP types (addresses, extensions, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
mod error;
pub mod parser;
pub mod server;
pub mod types;

pub use error::{Error, Result};
pub use server::{InboundMessage, MailHandler, Server, ServerConfig, Session};
pub use types::{Address, Extension, Reply, ReplyCode};
