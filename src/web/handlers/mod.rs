//! API handlers for the web surface.

pub mod auth;
pub mod rooms;

pub use auth::*;
pub use rooms::*;
