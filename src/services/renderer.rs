//! State renderer
//!
//! Presentation side of the relay: watches the shared store and writes the
//! latest values to the log whenever they change.

use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::models::{SessionMode, TelemetrySnapshot};
use crate::state::{MessageHistory, SharedState};

/// One line with every telemetry field
pub fn render_telemetry(snapshot: &TelemetrySnapshot) -> String {
    format!(
        "Latitude: {} | Longitude: {} | Azimuth: {}",
        snapshot.latitude, snapshot.longitude, snapshot.azimuth
    )
}

/// Latest chat message with its sequence number
pub fn render_latest_message(history: &MessageHistory) -> Option<String> {
    history
        .last()
        .map(|text| format!("#{} {}", history.total(), text))
}

/// Renders store changes until shut down
pub struct StateRenderer {
    store: SharedState,
    mode: SessionMode,
}

impl StateRenderer {
    pub fn new(store: SharedState, mode: SessionMode) -> Self {
        Self { store, mode }
    }

    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut telemetry = self.store.telemetry.subscribe();
        let mut messages = self.store.messages.subscribe();

        info!(mode = self.mode.as_str(), "Starting state renderer");
        if self.mode == SessionMode::Telemetry {
            info!("{}", render_telemetry(&telemetry.borrow_and_update()));
        }

        loop {
            tokio::select! {
                changed = telemetry.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let line = render_telemetry(&telemetry.borrow_and_update());
                    info!("{}", line);
                }
                changed = messages.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let history = messages.borrow_and_update().clone();
                    if let Some(line) = render_latest_message(&history) {
                        info!("{}", line);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("State renderer shutting down");
                        break;
                    }
                }
            }
        }
    }
}

/// Handle for stopping the renderer
pub struct StateRendererHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl StateRendererHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
