//! Server implementation
//!
//! Provides the WebSocket endpoint and read-only HTTP views of the shared
//! state.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::{AppState, RelayServer, ServerHandle, StopOutcome};
