//! WebSocket handler for live cache views.
//!
//! Each connection may follow one job view and the notification view. A
//! subscription is a forwarding task from a live query to the connection's
//! outgoing channel; it is replaced on re-subscribe and aborted on
//! unsubscribe or disconnect.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::live::{live_jobs, LiveQuery};
use crate::websocket::{ClientMessage, ConnectionManager, ServerMessage, Topic};
use crate::AppState;

type Subscriptions = HashMap<Topic, JoinHandle<()>>;

/// Handle an established WebSocket connection.
///
/// This function:
/// 1. Registers the connection with the manager
/// 2. Spawns a task to forward outgoing messages
/// 3. Processes incoming messages in a loop
/// 4. Cleans up subscriptions on disconnect
pub async fn handle_websocket_connection(socket: WebSocket, state: AppState) {
    let conn_manager = state.conn_manager.clone();

    // Split the socket into sender and receiver
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Create channel for sending messages to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let conn_id = conn_manager.register(tx);
    tracing::info!(conn_id = %conn_id, "WebSocket client connected");

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
    });

    let mut subscriptions = Subscriptions::new();

    // Process incoming messages
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Some(response) =
                    process_message(&text, &state, &conn_id, &mut subscriptions).await
                {
                    conn_manager.send_to(&conn_id, response);
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!("Binary messages not supported");
            }
            Ok(Message::Ping(data)) => {
                tracing::trace!("Received ping: {} bytes", data.len());
            }
            Ok(Message::Pong(_)) => {
                tracing::trace!("Received pong");
            }
            Ok(Message::Close(_)) => {
                tracing::info!(conn_id = %conn_id, "WebSocket close frame received");
                break;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    // Clean up
    for (_, task) in subscriptions.drain() {
        task.abort();
    }
    conn_manager.unregister(&conn_id);
    send_task.abort();

    tracing::info!(
        conn_id = %conn_id,
        active_connections = conn_manager.connection_count(),
        "WebSocket client disconnected"
    );
}

/// Process a client message; returns a direct reply if there is one.
///
/// Subscription results are delivered by their forwarding tasks.
async fn process_message(
    text: &str,
    state: &AppState,
    conn_id: &str,
    subscriptions: &mut Subscriptions,
) -> Option<ServerMessage> {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            return Some(ServerMessage::error(
                format!("Invalid message format: {}", e),
                None,
            ));
        }
    };

    match client_msg {
        ClientMessage::SubscribeJobs {
            filter,
            page,
            page_size,
            all,
            request_id,
        } => {
            let view = ClientMessage::job_view(filter, page, page_size, all);
            match live_jobs(state.engine.local(), view).await {
                Ok(live) => {
                    let task = forward(
                        live,
                        state.conn_manager.clone(),
                        conn_id.to_string(),
                        request_id,
                        |page, request_id| ServerMessage::JobsPage {
                            page: (*page).clone(),
                            request_id,
                        },
                    );
                    replace(subscriptions, Topic::Jobs, task);
                    None
                }
                Err(e) => Some(ServerMessage::error(e.to_string(), request_id)),
            }
        }

        ClientMessage::SubscribeNotifications { request_id } => {
            match state.notifications.live().await {
                Ok(live) => {
                    let task = forward(
                        live,
                        state.conn_manager.clone(),
                        conn_id.to_string(),
                        request_id,
                        |view, request_id| ServerMessage::Notifications {
                            view: (*view).clone(),
                            request_id,
                        },
                    );
                    replace(subscriptions, Topic::Notifications, task);
                    None
                }
                Err(e) => Some(ServerMessage::error(e.to_string(), request_id)),
            }
        }

        ClientMessage::Unsubscribe { topic } => {
            if let Some(task) = subscriptions.remove(&topic) {
                task.abort();
                tracing::debug!(conn_id = %conn_id, ?topic, "Unsubscribed");
            }
            None
        }

        ClientMessage::Ping => Some(ServerMessage::Pong),
    }
}

fn replace(subscriptions: &mut Subscriptions, topic: Topic, task: JoinHandle<()>) {
    if let Some(previous) = subscriptions.insert(topic, task) {
        previous.abort();
    }
}

/// Push the current result and then every change until the connection goes
/// away. The request id is echoed on the first message only.
fn forward<T, F>(
    mut live: LiveQuery<T>,
    conn_manager: Arc<ConnectionManager>,
    conn_id: String,
    request_id: Option<String>,
    to_message: F,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>, Option<String>) -> ServerMessage + Send + 'static,
{
    tokio::spawn(async move {
        if !conn_manager.send_to(&conn_id, to_message(live.current(), request_id)) {
            return;
        }
        while let Some(value) = live.next().await {
            if !conn_manager.send_to(&conn_id, to_message(value, None)) {
                break;
            }
        }
    })
}
