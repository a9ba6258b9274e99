//! Process-wide observable state written by sessions
//!
//! Sessions only write here; presentation code reads snapshots or
//! subscribes for change notifications.

mod message_log;
mod telemetry;

pub use message_log::{MessageHistory, MessageLog};
pub use telemetry::TelemetryStore;

/// Both stores, cheap to clone into every session
#[derive(Clone, Default)]
pub struct SharedState {
    pub telemetry: TelemetryStore,
    pub messages: MessageLog,
}

impl SharedState {
    /// `message_capacity` of `None` or `Some(0)` keeps every message
    pub fn new(message_capacity: Option<usize>) -> Self {
        Self {
            telemetry: TelemetryStore::new(),
            messages: MessageLog::new(message_capacity),
        }
    }
}
