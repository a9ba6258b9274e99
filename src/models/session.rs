use serde::{Deserialize, Serialize};

/// How a session turns inbound text into state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Overwrite telemetry slots from `key:value` frames
    #[default]
    Telemetry,
    /// Append every message to the log and acknowledge it
    Chat,
}

impl SessionMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "telemetry" | "sensor" | "sensors" => Some(Self::Telemetry),
            "chat" | "messages" | "log" => Some(Self::Chat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Telemetry => "telemetry",
            Self::Chat => "chat",
        }
    }
}
