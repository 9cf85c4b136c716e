//! Router configuration for the web surface.

use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_room, get_room, list_rooms, login, logout, me, register, rename_room, room_messages,
};
use super::middleware::create_cors_layer;
use super::state::AppState;
use super::ws::chat_ws_handler;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me));

    let room_routes = Router::new()
        .route("/", get(list_rooms).post(create_room))
        .route("/:id", get(get_room).patch(rename_room))
        .route("/:id/messages", get(room_messages));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/rooms", room_routes);

    Router::new()
        .nest("/api", api_routes)
        .route("/ws/rooms/:id", get(chat_ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Create a router serving the static client, if the directory exists.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    let dir = Path::new(static_path);
    if !dir.is_dir() {
        tracing::warn!("Static path not found: {}", static_path);
        return None;
    }

    let index = ServeFile::new(dir.join("index.html"));
    Some(Router::new().fallback_service(ServeDir::new(dir).fallback(index)))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
