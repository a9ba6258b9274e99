//! Route definitions

use axum::routing::get;
use axum::Router;

use super::handlers;
use super::server::AppState;
use super::websocket;

/// Create the router with the WebSocket endpoint mounted at `ws_path`
pub fn create_router(ws_path: &str, state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        // Read-only state
        .route("/api/state", get(handlers::state::get_state))
        .route("/api/telemetry/:key", get(handlers::state::get_telemetry))
        // WebSocket endpoint
        .route(ws_path, get(websocket::relay_ws))
        .with_state(state)
}
