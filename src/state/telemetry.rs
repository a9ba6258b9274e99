//! Last-write-wins telemetry cell

use std::sync::Arc;

use tokio::sync::watch;

use crate::models::{TelemetryKey, TelemetrySnapshot, TelemetryUpdate};

/// Latest telemetry values shared between sessions and readers
///
/// Every update runs under the channel's write lock, so a reader either sees
/// the value before or after a write, never a partial one.
#[derive(Clone)]
pub struct TelemetryStore {
    tx: Arc<watch::Sender<TelemetrySnapshot>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(TelemetrySnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Overwrite one slot and notify subscribers
    pub fn apply(&self, update: TelemetryUpdate) {
        self.tx.send_modify(|snapshot| snapshot.apply(update));
    }

    /// Record a server-side event in the status slot and notify subscribers
    pub fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        self.tx.send_modify(|snapshot| snapshot.set_status(status));
    }

    /// Owned copy of the current values
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.tx.borrow().clone()
    }

    pub fn get(&self, key: TelemetryKey) -> String {
        self.tx.borrow().get(key).to_string()
    }

    /// Receiver that wakes on every applied update
    pub fn subscribe(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.tx.subscribe()
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}
