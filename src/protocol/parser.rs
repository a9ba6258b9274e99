//! Text frame classification
//!
//! A frame is a telemetry update only when it has the exact shape
//! `<key>:<value>` with a recognised key and a single separator.
//! Everything else is an opaque message.

use crate::models::{TelemetryKey, TelemetryUpdate};

/// Result of classifying one text frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedFrame {
    Telemetry(TelemetryUpdate),
    Raw(String),
}

/// Classify a text payload. Never fails.
pub fn parse_frame(text: &str) -> ParsedFrame {
    if let Some((key, value)) = text.split_once(':') {
        // `a:b:c` splits into three parts and is not a telemetry frame
        if !value.contains(':') {
            if let Some(key) = TelemetryKey::parse(key) {
                return ParsedFrame::Telemetry(TelemetryUpdate {
                    key,
                    value: value.to_string(),
                });
            }
        }
    }

    ParsedFrame::Raw(text.to_string())
}
