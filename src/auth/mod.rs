//! Authentication module for stockchat.
//!
//! This module provides password hashing, registration and login sessions.

mod password;
mod registration;
mod session;
pub mod validation;

pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use registration::{authenticate, register, RegistrationError};
pub use session::{AuthSession, SessionError, SessionManager, DEFAULT_SESSION_DURATION_SECS};
pub use validation::ValidationError;
