//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use medchat_chat::ChatService;

/// Shared application state.
///
/// Cheap to clone; the chat service is behind an `Arc` and does its own
/// locking.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    /// Port the server binds, used for the CORS allow-list.
    pub port: u16,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(chat: ChatService, port: u16) -> Self {
        Self {
            chat: Arc::new(chat),
            port,
            start_time: Instant::now(),
        }
    }
}
