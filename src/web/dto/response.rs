//! Response DTOs for Web API.

use serde::Serialize;

use crate::db::{Room, User};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// User information in responses.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    /// User ID.
    pub id: i64,
    /// Username.
    pub username: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

/// Room with its live member count.
#[derive(Debug, Serialize)]
pub struct RoomResponse {
    /// Room ID.
    pub id: String,
    /// Room name.
    pub name: String,
    /// Connections currently joined.
    pub members: usize,
    /// Creation timestamp.
    pub created_at: String,
    /// Last rename timestamp.
    pub updated_at: String,
}

impl RoomResponse {
    /// Build from a stored room and a member count.
    pub fn new(room: Room, members: usize) -> Self {
        Self {
            id: room.id,
            name: room.name,
            members,
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}
