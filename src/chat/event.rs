//! Chat events delivered to room members.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Display name used for bot results.
pub const BOT_NAME: &str = "Stock Bot";

/// Display name used for system notices.
pub const SYSTEM_NAME: &str = "System";

/// Kind of chat event. Clients render each kind differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Message typed by a user.
    #[serde(rename = "chat")]
    UserMessage,
    /// Join/leave notices. Never persisted.
    #[serde(rename = "system")]
    SystemNotice,
    /// Rendered outcome of a stock quote command.
    #[serde(rename = "bot")]
    BotResult,
}

impl EventKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::UserMessage => "chat",
            EventKind::SystemNotice => "system",
            EventKind::BotResult => "bot",
        }
    }

    /// Parse from the string stored in the database.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chat" => Some(EventKind::UserMessage),
            "system" => Some(EventKind::SystemNotice),
            "bot" => Some(EventKind::BotResult),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of the user driving a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User ID.
    pub user_id: i64,
    /// Display name.
    pub username: String,
}

impl Identity {
    /// Create a new identity.
    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// An event broadcast to a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Persistence ID (None until saved, always None for system notices).
    pub id: Option<i64>,
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Sender's user ID (None for system and bot events).
    pub user_id: Option<i64>,
    /// Sender's display name.
    pub username: String,
    /// Room the event is addressed to.
    pub room_id: String,
    /// Body text.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ChatEvent {
    /// Create a user message.
    pub fn user_message(
        identity: &Identity,
        room_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            kind: EventKind::UserMessage,
            user_id: Some(identity.user_id),
            username: identity.username.clone(),
            room_id: room_id.into(),
            content: content.into(),
            created_at: monotonic_now(),
        }
    }

    /// Create a system notice.
    pub fn system(room_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: EventKind::SystemNotice,
            user_id: None,
            username: SYSTEM_NAME.to_string(),
            room_id: room_id.into(),
            content: content.into(),
            created_at: monotonic_now(),
        }
    }

    /// Create a bot result.
    pub fn bot(room_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: EventKind::BotResult,
            user_id: None,
            username: BOT_NAME.to_string(),
            room_id: room_id.into(),
            content: content.into(),
            created_at: monotonic_now(),
        }
    }

    /// Notice broadcast after a user joins.
    pub fn joined(room_id: impl Into<String>, username: &str) -> Self {
        Self::system(room_id, format!("{} joined the chat", display_name(username)))
    }

    /// Notice broadcast after a user leaves.
    pub fn left(room_id: impl Into<String>, username: &str) -> Self {
        Self::system(room_id, format!("{} left the chat", display_name(username)))
    }

    /// Whether this event is written to the message store.
    pub fn is_persistent(&self) -> bool {
        self.kind != EventKind::SystemNotice
    }
}

fn display_name(username: &str) -> &str {
    if username.trim().is_empty() {
        "Someone"
    } else {
        username
    }
}

static LAST_TIMESTAMP_MICROS: AtomicI64 = AtomicI64::new(0);

/// Current time, strictly increasing across calls within this process.
pub fn monotonic_now() -> DateTime<Utc> {
    let now = Utc::now().timestamp_micros();
    let mut last = LAST_TIMESTAMP_MICROS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_TIMESTAMP_MICROS.compare_exchange_weak(
            last,
            next,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => {
                return Utc
                    .timestamp_micros(next)
                    .single()
                    .unwrap_or_else(Utc::now);
            }
            Err(actual) => last = actual,
        }
    }
}
