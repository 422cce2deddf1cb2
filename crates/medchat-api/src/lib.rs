//! medchat API crate: axum HTTP surface over the chat service.
//!
//! Exposes health, the canned question list, and session endpoints for
//! creating, inspecting, clearing and asking within a conversation.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
