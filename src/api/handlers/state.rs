//! Read-only views of the shared state

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::api::server::AppState;
use crate::error::RelayError;
use crate::models::{SessionMode, TelemetryKey, TelemetrySnapshot};

/// Full snapshot returned by `GET /api/state`
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub mode: SessionMode,
    pub telemetry: TelemetrySnapshot,
    pub messages: Vec<String>,
    pub total_messages: u64,
    pub active_sessions: usize,
    pub uptime_secs: u64,
}

/// Get the current telemetry and message log
pub async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    let history = state.store.messages.history();

    Json(StateResponse {
        mode: state.mode,
        telemetry: state.store.telemetry.snapshot(),
        messages: history.messages().map(str::to_string).collect(),
        total_messages: history.total(),
        active_sessions: state.sessions.len(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// Get a single telemetry field
pub async fn get_telemetry(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, RelayError> {
    let Some(key) = TelemetryKey::parse(&key) else {
        return Err(RelayError::UnknownTelemetryKey(key));
    };

    Ok(Json(json!({
        "key": key,
        "value": state.store.telemetry.get(key),
    })))
}
