use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value shown for a telemetry field that has not been reported yet
pub const AWAITING: &str = "Aguardando...";

/// Telemetry fields a client may report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryKey {
    Latitude,
    Longitude,
    Azimuth,
}

impl TelemetryKey {
    pub const ALL: [TelemetryKey; 3] = [Self::Latitude, Self::Longitude, Self::Azimuth];

    /// Match a wire key exactly (case sensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "latitude" => Some(Self::Latitude),
            "longitude" => Some(Self::Longitude),
            "azimuth" => Some(Self::Azimuth),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::Azimuth => "azimuth",
        }
    }
}

impl std::fmt::Display for TelemetryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parsed `key:value` telemetry frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryUpdate {
    pub key: TelemetryKey,
    pub value: String,
}

/// Latest known telemetry values
///
/// `status` is written by the server only (lifecycle events and frames that
/// are not telemetry); clients cannot address it with a `key:value` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub latitude: String,
    pub longitude: String,
    pub azimuth: String,
    pub status: String,
    /// Time of the most recent applied update
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            latitude: AWAITING.to_string(),
            longitude: AWAITING.to_string(),
            azimuth: AWAITING.to_string(),
            status: AWAITING.to_string(),
            updated_at: None,
        }
    }
}

impl TelemetrySnapshot {
    pub fn get(&self, key: TelemetryKey) -> &str {
        match key {
            TelemetryKey::Latitude => &self.latitude,
            TelemetryKey::Longitude => &self.longitude,
            TelemetryKey::Azimuth => &self.azimuth,
        }
    }

    /// Overwrite one slot and stamp the update time
    pub fn apply(&mut self, update: TelemetryUpdate) {
        let slot = match update.key {
            TelemetryKey::Latitude => &mut self.latitude,
            TelemetryKey::Longitude => &mut self.longitude,
            TelemetryKey::Azimuth => &mut self.azimuth,
        };
        *slot = update.value;
        self.updated_at = Some(Utc::now());
    }

    /// Replace the server status line; telemetry fields and `updated_at` are untouched
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Whether a field still holds the initial sentinel
    pub fn is_awaiting(&self, key: TelemetryKey) -> bool {
        self.get(key) == AWAITING
    }
}
