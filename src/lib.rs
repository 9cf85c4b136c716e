//! stockchat - real-time chat rooms with an out-of-band stock quote bot.
//!
//! Users chat in rooms over WebSockets. Typing `/stock=SYMBOL` sends a quote
//! request through a message queue to a separate bot process, whose answer
//! is posted back into the room.

pub mod app;
pub mod auth;
pub mod bot;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod queue;
pub mod web;

pub use auth::{
    authenticate, hash_password, register, validate_password, verify_password, AuthSession,
    PasswordError, RegistrationError, SessionError, SessionManager, ValidationError,
};
pub use config::Config;
pub use db::{Database, NewUser, Room, RoomRepository, User, UserRepository};
pub use error::{ChatError, Result};
