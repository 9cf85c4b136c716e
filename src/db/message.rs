//! Message repository and the SQLite message store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::chat::{ChatEvent, EventKind, MessageStore};
use crate::{ChatError, Result};

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    room_id: String,
    user_id: Option<i64>,
    username: String,
    content: String,
    kind: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for ChatEvent {
    type Error = ChatError;

    fn try_from(row: MessageRow) -> Result<Self> {
        let kind = EventKind::parse(&row.kind)
            .ok_or_else(|| ChatError::Database(format!("unknown message kind: {}", row.kind)))?;
        Ok(ChatEvent {
            id: Some(row.id),
            kind,
            user_id: row.user_id,
            username: row.username,
            room_id: row.room_id,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

/// Repository for message operations.
pub struct MessageRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MessageRepository<'a> {
    /// Create a new MessageRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an event and return its ID. System notices are rejected.
    pub async fn create(&self, event: &ChatEvent) -> Result<i64> {
        if !event.is_persistent() {
            return Err(ChatError::Validation(
                "system notices are not persisted".to_string(),
            ));
        }

        let result = sqlx::query(
            "INSERT INTO messages (room_id, user_id, username, content, kind, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.room_id)
        .bind(event.user_id)
        .bind(&event.username)
        .bind(&event.content)
        .bind(event.kind.as_str())
        .bind(event.created_at)
        .execute(self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get the most recent messages of a room, oldest first.
    pub async fn list_recent(&self, room_id: &str, limit: usize) -> Result<Vec<ChatEvent>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, room_id, user_id, username, content, kind, created_at FROM (
                 SELECT * FROM messages WHERE room_id = ? ORDER BY id DESC LIMIT ?
             ) ORDER BY id ASC",
        )
        .bind(room_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ChatEvent::try_from).collect()
    }

    /// Count the messages of a room.
    #[cfg(test)]
    pub async fn count(&self, room_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE room_id = ?")
            .bind(room_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Message store backed by the SQLite database.
#[derive(Clone)]
pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    /// Create a store over a pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn save_message(&self, event: &ChatEvent) -> Result<i64> {
        MessageRepository::new(&self.pool).create(event).await
    }

    async fn load_recent(&self, room_id: &str, limit: usize) -> Result<Vec<ChatEvent>> {
        MessageRepository::new(&self.pool)
            .list_recent(room_id, limit)
            .await
    }
}
