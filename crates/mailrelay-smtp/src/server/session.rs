//! One SMTP conversation with one client.

use super::{InboundMessage, MailHandler, ServerConfig};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::types::{Address, Reply, ReplyCode};
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, warn};

/// Longest accepted command line, CRLF included (RFC 5321 4.5.3.1.4 allows
/// 512; extensions push it further).
const COMMAND_LINE_LIMIT: usize = 2048;

/// SMTP session state for one connection.
///
/// Generic over the stream so it can run over a TCP socket or an
/// in-memory mock.
pub struct Session<'a, S, H> {
    reader: BufReader<S>,
    peer: SocketAddr,
    config: &'a ServerConfig,
    handler: &'a H,
    greeted: bool,
    from: Option<String>,
    to: Vec<String>,
}

impl<'a, S, H> Session<'a, S, H>
where
    S: AsyncRead + AsyncWrite + Unpin,
    H: MailHandler,
{
    /// Creates a session over an accepted stream.
    pub fn new(stream: S, peer: SocketAddr, config: &'a ServerConfig, handler: &'a H) -> Self {
        Self {
            reader: BufReader::new(stream),
            peer,
            config,
            handler,
            greeted: false,
            from: None,
            to: Vec::new(),
        }
    }

    /// Runs the conversation until the client quits or disconnects.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or idle timeout.
    pub async fn run(mut self) -> Result<()> {
        let greeting = format!("{} ESMTP ready", self.config.hostname);
        self.reply(&Reply::single(ReplyCode::SERVICE_READY, greeting))
            .await?;

        let mut line = Vec::new();
        loop {
            match self.read_line(&mut line, COMMAND_LINE_LIMIT).await {
                Ok(0) => {
                    debug!(peer = %self.peer, "Client closed connection");
                    return Ok(());
                }
                Ok(_) => {}
                Err(Error::LineTooLong) => {
                    self.reply(&Reply::single(ReplyCode::SYNTAX_ERROR, "Line too long"))
                        .await?;
                    continue;
                }
                Err(Error::Timeout(secs)) => return self.close_idle(secs).await,
                Err(e) => return Err(e),
            }

            let text = String::from_utf8_lossy(&line);
            let command = match Command::parse(&text) {
                Ok(command) => command,
                Err(Error::UnknownCommand(verb)) => {
                    debug!(peer = %self.peer, %verb, "Unrecognized command");
                    self.reply(&Reply::single(
                        ReplyCode::SYNTAX_ERROR,
                        "Command not recognized",
                    ))
                    .await?;
                    continue;
                }
                Err(e) => {
                    self.reply(&Reply::single(ReplyCode::PARAMETER_ERROR, e.to_string()))
                        .await?;
                    continue;
                }
            };

            debug!(peer = %self.peer, verb = command.verb(), "Command");
            if !self.dispatch(command).await? {
                return Ok(());
            }
        }
    }

    /// Executes one command. Returns `false` once the session must end.
    async fn dispatch(&mut self, command: Command) -> Result<bool> {
        let config = self.config;
        let hostname = &config.hostname;

        let reply = match command {
            Command::Helo { hostname: client } => {
                self.greeted = true;
                self.reset();
                Reply::single(ReplyCode::OK, format!("{hostname} greets {client}"))
            }
            Command::Ehlo { hostname: client } => {
                self.greeted = true;
                self.reset();
                let mut lines = vec![format!("{hostname} greets {client}")];
                lines.extend(config.extensions().iter().map(ToString::to_string));
                Reply::new(ReplyCode::OK, lines)
            }
            Command::MailFrom { from, size } => {
                if !self.greeted {
                    Reply::single(ReplyCode::BAD_SEQUENCE, "Send HELO or EHLO first")
                } else if self.from.is_some() {
                    Reply::single(ReplyCode::BAD_SEQUENCE, "Nested MAIL command")
                } else if size.is_some_and(|size| size > config.max_message_size) {
                    Reply::single(
                        ReplyCode::EXCEEDED_STORAGE,
                        "Message size exceeds fixed maximum message size",
                    )
                } else {
                    self.from = Some(from.map(Address::into_string).unwrap_or_default());
                    Reply::single(ReplyCode::OK, "OK")
                }
            }
            Command::RcptTo { to } => {
                if self.from.is_none() {
                    Reply::single(ReplyCode::BAD_SEQUENCE, "Need MAIL command")
                } else if self.to.len() >= config.max_recipients {
                    Reply::single(ReplyCode::INSUFFICIENT_STORAGE, "Too many recipients")
                } else {
                    self.to.push(to.into_string());
                    Reply::single(ReplyCode::OK, "OK")
                }
            }
            Command::Data => {
                if self.to.is_empty() {
                    Reply::single(ReplyCode::BAD_SEQUENCE, "Need RCPT command")
                } else {
                    self.reply(&Reply::single(
                        ReplyCode::START_DATA,
                        "End data with <CR><LF>.<CR><LF>",
                    ))
                    .await?;
                    self.deliver().await?
                }
            }
            Command::Rset => {
                self.reset();
                Reply::single(ReplyCode::OK, "OK")
            }
            Command::Noop => Reply::single(ReplyCode::OK, "OK"),
            Command::Vrfy => Reply::single(
                ReplyCode::CANNOT_VERIFY,
                "Cannot VRFY user, but will accept message",
            ),
            Command::Quit => {
                let text = format!("{hostname} closing connection");
                self.reply(&Reply::single(ReplyCode::CLOSING, text)).await?;
                return Ok(false);
            }
            Command::StartTls | Command::Auth => {
                Reply::single(ReplyCode::NOT_IMPLEMENTED, "Command not implemented")
            }
        };

        self.reply(&reply).await?;
        Ok(true)
    }

    /// Receives the message body and hands the transaction to the handler.
    async fn deliver(&mut self) -> Result<Reply> {
        let data = self.receive_data().await?;
        let from = self.from.take().unwrap_or_default();
        let to = std::mem::take(&mut self.to);

        let Some(data) = data else {
            warn!(peer = %self.peer, %from, "Message exceeds size limit");
            return Ok(Reply::single(
                ReplyCode::EXCEEDED_STORAGE,
                "Message exceeds fixed maximum message size",
            ));
        };

        let message = InboundMessage {
            origin: self.peer,
            from,
            to,
            data,
        };

        match self.handler.handle(message).await {
            Ok(()) => Ok(Reply::single(ReplyCode::OK, "OK: queued")),
            Err(e) => {
                error!(peer = %self.peer, error = %e, "Message handler failed");
                Ok(Reply::single(ReplyCode::LOCAL_ERROR, "Unable to process mail"))
            }
        }
    }

    /// Reads `DATA` content up to the lone-dot terminator.
    ///
    /// Returns `None` when the content exceeds the size limit; the rest of
    /// the content is still consumed so the session stays in sync.
    async fn receive_data(&mut self) -> Result<Option<Vec<u8>>> {
        let limit = self.config.max_message_size;
        let line_limit = limit.saturating_add(2).max(COMMAND_LINE_LIMIT);
        let mut data = Vec::new();
        let mut line = Vec::new();
        let mut oversized = false;

        loop {
            match self.read_line(&mut line, line_limit).await {
                Ok(0) => {
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed during DATA",
                    )));
                }
                Ok(_) => {}
                Err(Error::LineTooLong) => {
                    oversized = true;
                    continue;
                }
                Err(Error::Timeout(secs)) => return self.close_idle(secs).await,
                Err(e) => return Err(e),
            }

            if line == b".\r\n" || line == b".\n" {
                break;
            }

            // Dot-unstuffing (RFC 5321 4.5.2)
            let content = line.strip_prefix(b".").unwrap_or(&line);
            if oversized || data.len() + content.len() > limit {
                oversized = true;
            } else {
                data.extend_from_slice(content);
            }
        }

        Ok((!oversized).then_some(data))
    }

    /// Sends `421` and ends the session with [`Error::Timeout`].
    async fn close_idle<T>(&mut self, secs: u64) -> Result<T> {
        let text = format!("{} Idle timeout, closing connection", self.config.hostname);
        self.reply(&Reply::single(ReplyCode::SERVICE_UNAVAILABLE, text))
            .await?;
        Err(Error::Timeout(secs))
    }

    /// Reads one line into `buf`, enforcing the idle timeout and `limit`.
    async fn read_line(&mut self, buf: &mut Vec<u8>, limit: usize) -> Result<usize> {
        buf.clear();
        let idle = self.config.idle_timeout;
        let mut reader = (&mut self.reader).take(limit as u64);
        let n = tokio::time::timeout(idle, reader.read_until(b'\n', buf))
            .await
            .map_err(|_| Error::Timeout(idle.as_secs()))??;

        if n == limit && !buf.ends_with(b"\n") {
            self.discard_line(limit).await?;
            return Err(Error::LineTooLong);
        }
        Ok(n)
    }

    /// Skips input up to and including the next newline.
    async fn discard_line(&mut self, limit: usize) -> Result<()> {
        let mut scratch = Vec::new();
        loop {
            scratch.clear();
            let n = (&mut self.reader)
                .take(limit as u64)
                .read_until(b'\n', &mut scratch)
                .await?;
            if n == 0 || scratch.ends_with(b"\n") {
                return Ok(());
            }
        }
    }

    async fn reply(&mut self, reply: &Reply) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(&reply.serialize()).await?;
        stream.flush().await?;
        Ok(())
    }

    fn reset(&mut self) {
        self.from = None;
        self.to.clear();
    }
}
