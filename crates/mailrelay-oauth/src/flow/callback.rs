//! Local HTTP endpoint receiving the authorization redirect.

use crate::error::{Error, Result};
use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const SUCCESS_PAGE: &str = "<h1>Success</h1><p>Authorized. You can close this window.</p>";
const FAILURE_PAGE: &str = "<h1>Authorization failed</h1><p>See the relay log for details.</p>";

/// Upper bound on waiting for the listener to drain after the code arrived.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Short-lived listener for one consent round.
///
/// The first request to `/` settles the round: a matching `state` with a
/// `code` yields the code, anything else yields the corresponding error.
/// Other paths get `404` and leave the round open.
#[derive(Debug)]
pub struct CallbackServer {
    addr: SocketAddr,
    code_rx: oneshot::Receiver<Result<String>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

struct CallbackState {
    expected_state: String,
    sender: Mutex<Option<oneshot::Sender<Result<String>>>>,
}

impl CallbackState {
    fn complete(&self, outcome: Result<String>) {
        let sender = self.sender.lock().ok().and_then(|mut slot| slot.take());
        if let Some(sender) = sender {
            let _ = sender.send(outcome);
        }
    }
}

#[derive(Debug, Default)]
struct CallbackParams {
    state: Option<String>,
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackParams {
    /// Decodes the query leniently; the first value of a repeated key wins.
    fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "state" => &mut params.state,
                "code" => &mut params.code,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    fn into_code(self, expected_state: &str) -> Result<String> {
        if self.state.as_deref() != Some(expected_state) {
            return Err(Error::StateMismatch);
        }
        if let Some(error) = self.error {
            return Err(Error::from_callback(
                &error,
                self.error_description.as_deref(),
            ));
        }
        self.code
            .filter(|code| !code.is_empty())
            .ok_or(Error::MissingCode)
    }
}

async fn receive(
    State(state): State<Arc<CallbackState>>,
    RawQuery(query): RawQuery,
) -> (StatusCode, Html<&'static str>) {
    let params = CallbackParams::from_query(query.as_deref().unwrap_or_default());
    match params.into_code(&state.expected_state) {
        Ok(code) => {
            info!("Authorization code received");
            state.complete(Ok(code));
            (StatusCode::OK, Html(SUCCESS_PAGE))
        }
        Err(e) => {
            warn!(error = %e, "Rejected authorization callback");
            state.complete(Err(e));
            (StatusCode::INTERNAL_SERVER_ERROR, Html(FAILURE_PAGE))
        }
    }
}

impl CallbackServer {
    /// Starts listening on `addr` (port 0 picks an ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(addr: SocketAddr, expected_state: impl Into<String>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let state = Arc::new(CallbackState {
            expected_state: expected_state.into(),
            sender: Mutex::new(Some(code_tx)),
        });
        let app = Router::new().route("/", get(receive)).with_state(state);

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                warn!(error = %e, "Callback listener failed");
            }
        });

        debug!(%addr, "Callback listener started");
        Ok(Self {
            addr,
            code_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Bound address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Redirect URI to register with the authorization request.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        if self.addr.ip().is_unspecified() {
            format!("http://localhost:{}/", self.addr.port())
        } else {
            format!("http://{}/", self.addr)
        }
    }

    /// Waits for the callback, then closes the listener.
    ///
    /// # Errors
    ///
    /// Returns the error carried by a rejected callback, or
    /// [`Error::CallbackClosed`] if the listener died first.
    pub async fn wait_for_code(mut self) -> Result<String> {
        let received = (&mut self.code_rx).await;
        self.close().await;
        received.map_err(|_| Error::CallbackClosed)?
    }

    async fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                warn!(addr = %self.addr, "Callback listener did not drain in time");
            }
        }
        debug!(addr = %self.addr, "Callback listener stopped");
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
