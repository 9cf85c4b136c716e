//! Shared state for HTTP and WebSocket handlers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::auth::SessionManager;
use crate::chat::ChatService;
use crate::config::SessionConfig;
use crate::Database;

/// Application state shared across handlers.
pub struct AppState {
    /// Database handle.
    pub db: Database,
    /// Login sessions.
    pub sessions: Mutex<SessionManager>,
    /// Chat service driving rooms.
    pub chat: Arc<ChatService>,
    /// Name of the session cookie.
    pub cookie_name: String,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, chat: Arc<ChatService>, session: &SessionConfig) -> Self {
        Self {
            db,
            sessions: Mutex::new(SessionManager::new(Duration::from_secs(
                session.duration_secs,
            ))),
            chat,
            cookie_name: session.cookie_name.clone(),
        }
    }
}
