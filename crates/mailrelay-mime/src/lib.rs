//! # mailrelay-mime
//!
//! Header-block parsing for RFC 5322 messages handed to the relay.
//!
//! The relay never inspects bodies. It needs to know whether the payload
//! is a structurally valid message (a header section followed by an
//! optional body) and to read a few header fields for logging.
//!
//! ## Quick Start
//!
//! ```
//! use mailrelay_mime::Message;
//!
//! let raw = b"From: sender@example.com\r\n\
//!             Subject: =?utf-8?B?SMOpbGxv?=\r\n\
//!             \r\n\
//!             Hello, World!";
//!
//! let message = Message::parse(raw).unwrap();
//! assert_eq!(message.subject_decoded().as_deref(), Some("Héllo"));
//! assert_eq!(message.body(), b"Hello, World!");
//! ```
//!
//! Payloads without a valid header section are rejected with an
//! [`Error`]:
//!
//! ```
//! use mailrelay_mime::Message;
//!
//! assert!(Message::parse(b"this is not a message").is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod header;
mod message;

pub mod encoding;

pub use error::{Error, Result};
pub use header::Headers;
pub use message::Message;
