//! Request handlers shared by the HTTP routes and the WebSocket endpoint.

mod jobs;
mod websocket;

pub use jobs::JobsQuery;
pub use websocket::handle_websocket_connection;
