//! # mailrelay-core
//!
//! The relay itself: mail accepted by the SMTP listener is parsed, checked
//! against the sender and recipient allow-lists, and forwarded verbatim to
//! the Gmail send API on behalf of the authorized account.
//!
//! This crate provides:
//! - [`PatternSet`] and [`Filter`] allow-lists
//! - [`MailIntake`], the per-message handler
//! - [`Forwarder`] and the [`GmailApi`] transport
//! - [`Config`] and [`run`], which wire everything together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod filter;
pub mod forward;
pub mod intake;
pub mod service;

pub use config::{Config, parse_listen_addr};
pub use error::{Error, Result};
pub use filter::{DropReason, Filter, PatternSet};
pub use forward::{Forwarder, GmailApi, SendApi, TransportError};
pub use intake::{MailIntake, Outcome};
pub use service::{run, serve};
