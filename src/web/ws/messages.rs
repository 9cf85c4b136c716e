//! WebSocket frame formats for chat communication.

use serde::Deserialize;

use crate::chat::ChatEvent;

/// Frame sent from client to server.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    /// Text typed by the user.
    pub content: String,
}

/// Extract the typed text from an inbound text frame.
///
/// Frames that are not a JSON `{"content": ...}` object are taken verbatim.
pub fn parse_frame(text: &str) -> String {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame.content,
        Err(_) => text.to_string(),
    }
}

/// Serialize an event for the outbound socket.
pub fn event_frame(event: &ChatEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}
