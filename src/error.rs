use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the relay
#[derive(Error, Debug)]
pub enum RelayError {
    // Startup errors
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Lookup errors
    #[error("Unknown telemetry key: {0}")]
    UnknownTelemetryKey(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            RelayError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

            // 404 Not Found
            RelayError::UnknownTelemetryKey(_) => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            RelayError::Bind { .. } | RelayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Implement IntoResponse for API error responses
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
