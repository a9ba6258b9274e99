//! Wire protocol: frame kinds, text classification and fixed server texts

pub mod frame;
pub mod parser;

pub use frame::{CloseReason, InboundFrame};
pub use parser::{parse_frame, ParsedFrame};

/// Sent to every client right after the upgrade
pub const WELCOME_MESSAGE: &str = "Bem-vindo ao WebSocket!";

/// Prefix of the acknowledgement sent for each chat message
pub const ACK_PREFIX: &str = "Recebido: ";

/// Acknowledgement text for a received chat message
pub fn ack_for(text: &str) -> String {
    format!("{}{}", ACK_PREFIX, text)
}
