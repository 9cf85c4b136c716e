//! Chat module for stockchat.
//!
//! This module provides the real-time side of the system:
//! - Chat events and the identities behind them
//! - Classification of client text into messages and quote commands
//! - The room hub that fans events out to live connections
//! - The result router that turns quote results into bot messages

mod command;
mod event;
mod history;
mod hub;
mod router;
mod service;

pub use command::{classify, ChatInput, COMMAND_SIGIL};
pub use event::{monotonic_now, ChatEvent, EventKind, Identity, BOT_NAME, SYSTEM_NAME};
pub use history::{MemoryMessageStore, MessageStore};
pub use hub::{Connection, ConnectionId, RoomHub};
pub use router::{render, ResultRouter};
pub use service::{ChatService, Session};
