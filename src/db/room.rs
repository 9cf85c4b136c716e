//! Room model and repository.

use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{ChatError, Result};

/// Maximum length of a room name in characters.
pub const MAX_ROOM_NAME_LENGTH: usize = 64;

/// A chat room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Room {
    /// Room ID (UUID).
    pub id: String,
    /// Display name (unique, case-insensitive).
    pub name: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last rename timestamp.
    pub updated_at: String,
}

/// Repository for room operations.
pub struct RoomRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RoomRepository<'a> {
    /// Create a new RoomRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a room with a fresh ID.
    pub async fn create(&self, name: &str) -> Result<Room> {
        let name = normalize_name(name)?;
        let id = Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO rooms (id, name) VALUES (?, ?)")
            .bind(&id)
            .bind(&name)
            .execute(self.pool)
            .await
            .map_err(name_conflict)?;

        self.get(&id)
            .await?
            .ok_or_else(|| ChatError::NotFound("room".to_string()))
    }

    /// Get a room by ID.
    pub async fn get(&self, id: &str) -> Result<Option<Room>> {
        let room = sqlx::query_as::<_, Room>(
            "SELECT id, name, created_at, updated_at FROM rooms WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(room)
    }

    /// Get a room by name (case-insensitive).
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Room>> {
        let room = sqlx::query_as::<_, Room>(
            "SELECT id, name, created_at, updated_at FROM rooms WHERE name = ? COLLATE NOCASE",
        )
        .bind(name.trim())
        .fetch_optional(self.pool)
        .await?;
        Ok(room)
    }

    /// List all rooms ordered by name.
    pub async fn list(&self) -> Result<Vec<Room>> {
        let rooms = sqlx::query_as::<_, Room>(
            "SELECT id, name, created_at, updated_at FROM rooms ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rooms)
    }

    /// Rename a room.
    ///
    /// Returns the updated room, or None if it does not exist.
    pub async fn rename(&self, id: &str, name: &str) -> Result<Option<Room>> {
        let name = normalize_name(name)?;

        let result = sqlx::query(
            "UPDATE rooms SET name = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(&name)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(name_conflict)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }
}

fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ChatError::Validation("room name is required".to_string()));
    }
    if name.chars().count() > MAX_ROOM_NAME_LENGTH {
        return Err(ChatError::Validation(format!(
            "room name must be at most {MAX_ROOM_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_string())
}

fn name_conflict(e: sqlx::Error) -> ChatError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            ChatError::Conflict("room name already taken".to_string())
        }
        e => ChatError::Database(e.to_string()),
    }
}
