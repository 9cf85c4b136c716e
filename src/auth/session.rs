//! Login sessions.
//!
//! Sessions live in memory and are identified by a random UUID token that
//! the web layer carries in a cookie.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::chat::Identity;

/// Session-related errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// Wrong username or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Session has expired.
    #[error("session expired")]
    SessionExpired,

    /// Session not found.
    #[error("session not found")]
    SessionNotFound,
}

/// Default session duration (24 hours).
pub const DEFAULT_SESSION_DURATION_SECS: u64 = 24 * 60 * 60;

/// A logged-in user's session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Session token (UUID v4).
    pub token: String,
    /// User ID.
    pub user_id: i64,
    /// Username at login time.
    pub username: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// Create a session lasting `duration`.
    pub fn new(user_id: i64, username: impl Into<String>, duration: Duration) -> Self {
        let now = Utc::now();
        Self {
            token: Uuid::new_v4().to_string(),
            user_id,
            username: username.into(),
            created_at: now,
            expires_at: now + chrono::Duration::from_std(duration).unwrap_or_default(),
        }
    }

    /// Check if the session has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Identity used for chat.
    pub fn identity(&self) -> Identity {
        Identity::new(self.user_id, self.username.clone())
    }
}

/// Tracks active sessions.
#[derive(Debug)]
pub struct SessionManager {
    sessions: HashMap<String, AuthSession>,
    duration: Duration,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_SESSION_DURATION_SECS))
    }
}

impl SessionManager {
    /// Create a manager issuing sessions of the given duration.
    pub fn new(duration: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            duration,
        }
    }

    /// Start a session for a user.
    pub fn create(&mut self, user_id: i64, username: &str) -> AuthSession {
        let session = AuthSession::new(user_id, username, self.duration);
        self.sessions.insert(session.token.clone(), session.clone());
        info!(user_id, username = %username, "Session created");
        session
    }

    /// Get a live session by token. Expired sessions are removed.
    pub fn get(&mut self, token: &str) -> Result<AuthSession, SessionError> {
        let session = self
            .sessions
            .get(token)
            .ok_or(SessionError::SessionNotFound)?;

        if session.is_expired() {
            self.sessions.remove(token);
            return Err(SessionError::SessionExpired);
        }
        Ok(session.clone())
    }

    /// End a session. Returns whether it existed.
    pub fn remove(&mut self, token: &str) -> bool {
        match self.sessions.remove(token) {
            Some(session) => {
                info!(user_id = session.user_id, "Session logged out");
                true
            }
            None => {
                debug!("Logout: session not found");
                false
            }
        }
    }

    /// Drop expired sessions.
    pub fn cleanup(&mut self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired());
        let removed = before - self.sessions.len();
        if removed > 0 {
            debug!(removed, "Cleaned up expired sessions");
        }
        removed
    }

    /// Number of tracked sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
