//! WebSocket server lifecycle
//!
//! [`RelayServer::start`] binds the listener and serves on a background task;
//! the returned [`ServerHandle`] stops it with a grace period and a hard
//! deadline.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ServerConfig;
use crate::error::{RelayError, Result};
use crate::models::SessionMode;
use crate::state::SharedState;

use super::routes;

/// Shared state for route handlers and sessions
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<ServerConfig>,
    pub mode: SessionMode,
    pub store: SharedState,
    pub started_at: Instant,
    /// Every upgraded session task
    pub sessions: TaskTracker,
    /// Graceful shutdown: stop accepting, sessions send close
    pub shutdown: CancellationToken,
    /// Forced shutdown: sessions are dropped where they stand
    pub kill: CancellationToken,
}

impl AppState {
    pub fn new(server: ServerConfig, mode: SessionMode, store: SharedState) -> Self {
        Self {
            server: Arc::new(server),
            mode,
            store,
            started_at: Instant::now(),
            sessions: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            kill: CancellationToken::new(),
        }
    }
}

/// How a call to [`ServerHandle::stop`] finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Listener and all sessions finished before the force deadline
    Graceful,
    /// Remaining sessions were terminated at the force deadline
    Forced,
    /// Nothing to do
    AlreadyStopped,
}

/// WebSocket relay server
pub struct RelayServer {
    state: AppState,
}

impl RelayServer {
    /// Create a new server writing into `store`
    pub fn new(config: ServerConfig, mode: SessionMode, store: SharedState) -> Self {
        Self {
            state: AppState::new(config, mode, store),
        }
    }

    /// Build the router
    fn build_router(&self) -> Router {
        routes::create_router(&self.state.server.path, self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the listener and serve on a background task
    ///
    /// Returns once the socket is bound, so a port conflict is reported here
    /// rather than lost inside the task.
    #[instrument(skip(self))]
    pub async fn start(self) -> Result<ServerHandle> {
        self.state.server.validate()?;

        let addr = self.state.server.addr();
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| RelayError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let router = self.build_router();
        let shutdown = self.state.shutdown.clone();

        info!(
            mode = self.state.mode.as_str(),
            "WebSocket server listening on ws://{}{}", local_addr, self.state.server.path
        );
        self.state.store.telemetry.set_status(format!(
            "Listening on ws://{}{}",
            local_addr, self.state.server.path
        ));

        let listener_task = tokio::spawn(async move {
            let result = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;

            if let Err(e) = result {
                error!("WebSocket server error: {}", e);
            }
            debug!("Listener stopped accepting connections");
        });

        Ok(ServerHandle {
            local_addr,
            state: self.state,
            listener: Mutex::new(Some(listener_task)),
        })
    }
}

/// Handle to a running server
pub struct ServerHandle {
    local_addr: SocketAddr,
    state: AppState,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn store(&self) -> &SharedState {
        &self.state.store
    }

    /// Sessions whose task has not finished yet
    pub fn active_sessions(&self) -> usize {
        self.state.sessions.len()
    }

    pub fn is_running(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// Stop accepting, let sessions close for `grace_period`, and terminate
    /// whatever is left once `force_timeout` has passed since the call.
    ///
    /// Calling this on a stopped server returns immediately.
    pub async fn stop(&self, grace_period: Duration, force_timeout: Duration) -> StopOutcome {
        let Some(mut listener) = self.listener.lock().take() else {
            debug!("WebSocket server already stopped");
            return StopOutcome::AlreadyStopped;
        };

        let deadline = Instant::now() + force_timeout;
        let grace_period = grace_period.min(force_timeout);
        let listener_abort = listener.abort_handle();

        info!(
            active_sessions = self.active_sessions(),
            "Stopping WebSocket server"
        );

        self.state.shutdown.cancel();
        self.state.sessions.close();

        let sessions = self.state.sessions.clone();
        let drain = async {
            let _ = (&mut listener).await;
            sessions.wait().await;
        };
        tokio::pin!(drain);

        // A zero deadline terminates without waiting.
        let mut drained = false;
        if !force_timeout.is_zero() {
            drained = timeout(grace_period, &mut drain).await.is_ok();

            if !drained && Instant::now() < deadline {
                debug!(
                    remaining = self.active_sessions(),
                    "Grace period elapsed, waiting for force deadline"
                );
                drained = timeout_at(deadline, &mut drain).await.is_ok();
            }
        }

        let outcome = if drained {
            info!("WebSocket server stopped");
            StopOutcome::Graceful
        } else {
            warn!(
                remaining = self.active_sessions(),
                "Shutdown deadline reached, terminating remaining sessions"
            );
            self.state.kill.cancel();
            listener_abort.abort();
            StopOutcome::Forced
        };

        self.state.store.telemetry.set_status("Server stopped");
        outcome
    }
}
