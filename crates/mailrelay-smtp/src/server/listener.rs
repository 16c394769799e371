//! Accept loop spawning one session task per connection.

use super::{MailHandler, ServerConfig, Session};
use crate::error::Result;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// SMTP listener that hands every accepted message to `H`.
pub struct Server<H> {
    config: Arc<ServerConfig>,
    handler: Arc<H>,
}

impl<H> Clone for Server<H> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<H: MailHandler> Server<H> {
    /// Creates a server from its settings and message handler.
    pub fn new(config: ServerConfig, handler: H) -> Self {
        Self {
            config: Arc::new(config),
            handler: Arc::new(handler),
        }
    }

    /// Returns the server settings.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accepts connections forever.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's local address cannot be read.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        self.serve_with_shutdown(listener, std::future::pending())
            .await
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// Sessions already running are left to finish on their own tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's local address cannot be read.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let local = listener.local_addr()?;
        info!(addr = %local, hostname = %self.config.hostname, "SMTP listener started");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!(addr = %local, "SMTP listener stopped");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_session(stream, peer),
                    Err(e) => warn!(error = %e, "Failed to accept connection"),
                },
            }
        }
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        let config = Arc::clone(&self.config);
        let handler = Arc::clone(&self.handler);

        tokio::spawn(async move {
            debug!(%peer, "Connection accepted");
            match Session::new(stream, peer, &config, &*handler).run().await {
                Ok(()) => debug!(%peer, "Connection closed"),
                Err(e) => debug!(%peer, error = %e, "Session ended"),
            }
        });
    }
}
