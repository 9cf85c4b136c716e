//! Error types for stockchat.

use thiserror::Error;

use crate::queue::QueueError;

/// Common error type for stockchat.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Database error.
    ///
    /// Errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Queue transport error.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Uniqueness conflict, such as a taken name.
    #[error("{0}")]
    Conflict(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for ChatError {
    fn from(e: sqlx::Error) -> Self {
        ChatError::Database(e.to_string())
    }
}

/// Result type alias for stockchat operations.
pub type Result<T> = std::result::Result<T, ChatError>;
