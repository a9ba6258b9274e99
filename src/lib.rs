//! Sensor Relay - embedded WebSocket telemetry server
//!
//! Accepts WebSocket clients on a single endpoint and turns their text
//! frames into shared, observable state.
//!
//! ## Features
//!
//! - `key:value` telemetry frames (latitude, longitude, azimuth) with last-write-wins slots
//! - Chat mode with an append-only message log and per-message acknowledgements
//! - Keepalive pings, idle timeouts and configurable frame size limits
//! - Graceful shutdown with a grace period and a hard deadline
//! - Read-only HTTP snapshot of the current state

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod protocol;
pub mod services;
pub mod state;

pub use api::{RelayServer, ServerHandle, StopOutcome};
pub use config::Config;
pub use error::{RelayError, Result};
pub use state::SharedState;
