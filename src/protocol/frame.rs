//! Inbound WebSocket frame kinds as seen by a session

use axum::extract::ws::Message;

/// Close code and reason sent by the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.reason.is_empty() {
            write!(f, "code {}", self.code)
        } else {
            write!(f, "code {}: {}", self.code, self.reason)
        }
    }
}

/// The only frame distinctions a session acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Close(Option<CloseReason>),
    /// Binary, ping and pong frames
    Other,
}

impl From<Message> for InboundFrame {
    fn from(msg: Message) -> Self {
        match msg {
            Message::Text(text) => Self::Text(text),
            Message::Close(frame) => Self::Close(frame.map(|f| CloseReason {
                code: f.code,
                reason: f.reason.into_owned(),
            })),
            Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => Self::Other,
        }
    }
}
