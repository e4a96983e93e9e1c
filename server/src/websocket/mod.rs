//! WebSocket support for live cache views.
//!
//! Clients connect via WebSocket, subscribe to job pages or the notification
//! view, and receive a fresh result whenever the cache changes underneath
//! it. Alert cues and sync progress are pushed to every connection.

mod manager;
mod protocol;

pub use manager::ConnectionManager;
pub use protocol::*;
