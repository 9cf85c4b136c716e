//! Room handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::chat::ChatEvent;
use crate::db::{Room, RoomRepository};
use crate::web::dto::{ApiResponse, RoomRequest, RoomResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::middleware::SessionUser;
use crate::web::state::AppState;

/// GET /api/rooms - List rooms with their member counts.
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
    _user: SessionUser,
) -> Result<Json<ApiResponse<Vec<RoomResponse>>>, ApiError> {
    let rooms = RoomRepository::new(state.db.pool()).list().await?;

    let mut response = Vec::with_capacity(rooms.len());
    for room in rooms {
        response.push(with_members(&state, room).await);
    }

    Ok(Json(ApiResponse::new(response)))
}

/// POST /api/rooms - Create a room.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    SessionUser(session): SessionUser,
    ValidatedJson(req): ValidatedJson<RoomRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RoomResponse>>), ApiError> {
    let room = RoomRepository::new(state.db.pool()).create(&req.name).await?;
    info!(room_id = %room.id, name = %room.name, username = %session.username, "Room created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(RoomResponse::new(room, 0))),
    ))
}

/// GET /api/rooms/:id - Get a room.
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    _user: SessionUser,
    Path(room_id): Path<String>,
) -> Result<Json<ApiResponse<RoomResponse>>, ApiError> {
    let room = find_room(&state, &room_id).await?;
    Ok(Json(ApiResponse::new(with_members(&state, room).await)))
}

/// PATCH /api/rooms/:id - Rename a room.
pub async fn rename_room(
    State(state): State<Arc<AppState>>,
    SessionUser(session): SessionUser,
    Path(room_id): Path<String>,
    ValidatedJson(req): ValidatedJson<RoomRequest>,
) -> Result<Json<ApiResponse<RoomResponse>>, ApiError> {
    let room = RoomRepository::new(state.db.pool())
        .rename(&room_id, &req.name)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;
    info!(room_id = %room.id, name = %room.name, username = %session.username, "Room renamed");

    Ok(Json(ApiResponse::new(with_members(&state, room).await)))
}

/// GET /api/rooms/:id/messages - Recent messages, oldest first.
pub async fn room_messages(
    State(state): State<Arc<AppState>>,
    _user: SessionUser,
    Path(room_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ChatEvent>>>, ApiError> {
    let room = find_room(&state, &room_id).await?;
    let messages = state.chat.recent(&room.id).await?;
    Ok(Json(ApiResponse::new(messages)))
}

/// Load a room or fail with 404.
pub(crate) async fn find_room(state: &AppState, room_id: &str) -> Result<Room, ApiError> {
    RoomRepository::new(state.db.pool())
        .get(room_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))
}

async fn with_members(state: &AppState, room: Room) -> RoomResponse {
    let members = state.chat.hub().member_count(&room.id).await;
    RoomResponse::new(room, members)
}
