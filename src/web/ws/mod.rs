//! WebSocket module for real-time room chat.

pub mod chat;
pub mod messages;

pub use chat::chat_ws_handler;
pub use messages::{event_frame, parse_frame, ClientFrame};
