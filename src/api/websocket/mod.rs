//! WebSocket endpoint
//!
//! Each upgraded connection runs its own [`Session`] on a task tracked by
//! the server so shutdown can wait for it.

pub mod session;

pub use session::{Session, SessionEnd};

use std::net::SocketAddr;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use tracing::{debug, warn};

use crate::api::server::AppState;

/// WebSocket handler for telemetry and chat clients
pub async fn relay_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    debug!(peer = %peer, "WebSocket upgrade requested");

    let session = Session::from_state(&state, peer);
    let kill = state.kill.clone();
    let tracker = state.sessions.clone();
    let limit = state.server.frame_limit();

    ws.max_frame_size(limit)
        .max_message_size(limit)
        .on_failed_upgrade(move |e| warn!(peer = %peer, "WebSocket upgrade failed: {}", e))
        .on_upgrade(move |socket| async move {
            tracker.track_future(session.run(socket, kill)).await;
        })
}
