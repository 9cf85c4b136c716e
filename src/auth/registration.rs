//! User registration and credential checks.

use thiserror::Error;
use tracing::{info, warn};

use super::password::{hash_password, verify_password, PasswordError};
use super::validation::{validate_registration, ValidationError};
use crate::db::{NewUser, User, UserRepository};
use crate::ChatError;

/// Registration errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Username already exists.
    #[error("username already exists")]
    UsernameExists,

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<ChatError> for RegistrationError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::Conflict(_) => RegistrationError::UsernameExists,
            e => RegistrationError::Database(e.to_string()),
        }
    }
}

/// Register a new user.
pub async fn register(
    repo: &UserRepository<'_>,
    username: &str,
    password: &str,
) -> Result<User, RegistrationError> {
    validate_registration(username, password)?;

    if repo.get_by_username(username).await?.is_some() {
        return Err(RegistrationError::UsernameExists);
    }

    let hash = hash_password(password)?;
    let user = repo.create(&NewUser::new(username, hash)).await?;

    info!(user_id = user.id, username = %user.username, "User registered");
    Ok(user)
}

/// Check a username and password.
///
/// Returns None for an unknown user or a wrong password alike.
pub async fn authenticate(
    repo: &UserRepository<'_>,
    username: &str,
    password: &str,
) -> crate::Result<Option<User>> {
    let Some(user) = repo.get_by_username(username).await? else {
        warn!(username = %username, "Login failed: user not found");
        return Ok(None);
    };

    match verify_password(password, &user.password) {
        Ok(()) => Ok(Some(user)),
        Err(_) => {
            warn!(username = %username, "Login failed: wrong password");
            Ok(None)
        }
    }
}
