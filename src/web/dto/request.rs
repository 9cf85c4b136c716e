//! Request DTOs for Web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::{no_control_chars, not_empty_trimmed};

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

/// User registration request.
///
/// Field lengths are checked here; the character rules live in
/// [`crate::auth::validation`].
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Username.
    #[validate(length(min = 3, max = 32, message = "Username must be 3-32 characters"))]
    pub username: String,
    /// Password.
    #[validate(length(min = 6, max = 128, message = "Password must be 6-128 characters"))]
    pub password: String,
}

/// Room create or rename request.
#[derive(Debug, Deserialize, Validate)]
pub struct RoomRequest {
    /// Room name.
    #[validate(
        length(max = 64, message = "Room name must be at most 64 characters"),
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars")
    )]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MAX_ROOM_NAME_LENGTH;

    #[test]
    fn test_register_request_lengths() {
        let ok = RegisterRequest {
            username: "alice".to_string(),
            password: "secret1".to_string(),
        };
        assert!(ok.validate().is_ok());

        let short = RegisterRequest {
            username: "al".to_string(),
            password: "123".to_string(),
        };
        let errors = short.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_room_request() {
        let ok = RoomRequest {
            name: "General".to_string(),
        };
        assert!(ok.validate().is_ok());

        let blank = RoomRequest {
            name: "   ".to_string(),
        };
        assert!(blank.validate().is_err());

        let long = RoomRequest {
            name: "x".repeat(MAX_ROOM_NAME_LENGTH + 1),
        };
        assert!(long.validate().is_err());

        let control = RoomRequest {
            name: "bad\x07name".to_string(),
        };
        assert!(control.validate().is_err());
    }
}
