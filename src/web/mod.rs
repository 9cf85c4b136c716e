//! HTTP and WebSocket surface.
//!
//! Cookie-session authentication, a small REST API for rooms and messages,
//! and one WebSocket endpoint per room.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
pub use state::AppState;
