//! SMTP commands received from clients.

use crate::error::{Error, Result};
use crate::parser::{parse_mail_from, parse_rcpt_to, split_verb};
use crate::types::Address;

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO - Simple greeting
    Helo {
        /// Client hostname
        hostname: String,
    },
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS (not offered)
    StartTls,
    /// AUTH - Begin authentication (not offered)
    Auth,
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address, `None` for the null reverse path
        from: Option<Address>,
        /// Declared SIZE parameter
        size: Option<usize>,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// RSET - Reset transaction
    Rset,
    /// VRFY - Verify address
    Vrfy,
    /// NOOP - No operation
    Noop,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Parses one command line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCommand`] for unrecognized verbs and
    /// [`Error::Syntax`] or [`Error::InvalidAddress`] for malformed
    /// arguments.
    pub fn parse(line: &str) -> Result<Self> {
        let (verb, args) = split_verb(line);

        match verb.as_str() {
            "HELO" | "EHLO" => {
                if args.is_empty() {
                    return Err(Error::syntax(format!("{verb} requires a hostname")));
                }
                let hostname = args.to_string();
                if verb == "HELO" {
                    Ok(Self::Helo { hostname })
                } else {
                    Ok(Self::Ehlo { hostname })
                }
            }
            "MAIL" => {
                let (from, params) = parse_mail_from(args)?;
                let size = params
                    .iter()
                    .find(|(key, _)| key == "SIZE")
                    .and_then(|(_, value)| value.as_deref())
                    .map(|value| {
                        value
                            .parse::<usize>()
                            .map_err(|_| Error::syntax(format!("Bad SIZE value: {value}")))
                    })
                    .transpose()?;
                Ok(Self::MailFrom { from, size })
            }
            "RCPT" => Ok(Self::RcptTo {
                to: parse_rcpt_to(args)?,
            }),
            "DATA" => Ok(Self::Data),
            "RSET" => Ok(Self::Rset),
            "VRFY" => Ok(Self::Vrfy),
            "NOOP" => Ok(Self::Noop),
            "QUIT" => Ok(Self::Quit),
            "STARTTLS" => Ok(Self::StartTls),
            "AUTH" => Ok(Self::Auth),
            _ => Err(Error::UnknownCommand(verb)),
        }
    }

    /// Returns the command verb.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Helo { .. } => "HELO",
            Self::Ehlo { .. } => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::Auth => "AUTH",
            Self::MailFrom { .. } => "MAIL",
            Self::RcptTo { .. } => "RCPT",
            Self::Data => "DATA",
            Self::Rset => "RSET",
            Self::Vrfy => "VRFY",
            Self::Noop => "NOOP",
            Self::Quit => "QUIT",
        }
    }
}
