//! Jobsync Server - offline-first job-order cache with a local query API.
//!
//! The server mirrors the job-order tables of a remote Postgres store into a
//! persistent local cache, keeps it converging through bootstrap, delta and
//! repair passes, and serves reads (HTTP and live WebSocket views) from the
//! cache only. The current user's notifications are mirrored in realtime.

pub mod config;
pub mod error;
pub mod handlers;
pub mod live;
pub mod local;
pub mod notifications;
pub mod remote;
pub mod routes;
pub mod sync;
pub mod websocket;

use std::sync::Arc;

use axum::Router;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::local::LocalStore;
use crate::notifications::NotificationSync;
use crate::remote::RemoteSource;
use crate::sync::{BackgroundScheduler, SyncEngine};
use crate::websocket::{ConnectionManager, ServerMessage};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: SyncEngine,
    pub scheduler: Arc<BackgroundScheduler>,
    pub notifications: Arc<NotificationSync>,
    pub conn_manager: Arc<ConnectionManager>,
}

impl AppState {
    /// Wire the engine, scheduler and notification mirror to one cache.
    ///
    /// Nothing is started; see [`SyncEngine::start_session`],
    /// [`BackgroundScheduler::start`] and [`NotificationSync::start`].
    pub fn new(remote: Arc<dyn RemoteSource>, local: LocalStore, config: &Config) -> Self {
        let engine = SyncEngine::new(remote.clone(), local.clone(), config.sync.clone());
        let scheduler = Arc::new(BackgroundScheduler::new(engine.clone()));
        let notifications = Arc::new(NotificationSync::new(
            remote,
            local,
            config.user_id.clone(),
            config.snooze,
            config.notification_history_limit,
        ));
        Self {
            engine,
            scheduler,
            notifications,
            conn_manager: ConnectionManager::new_shared(),
        }
    }

    /// Full resync of the jobs, then refill the notification mirror the
    /// clear emptied.
    pub async fn resync(&self) -> error::Result<usize> {
        let count = self.engine.force_full_resync().await?;
        if let Err(err) = self.notifications.sync_initial().await {
            tracing::warn!(error = %err, "notification refill after resync failed");
        }
        Ok(count)
    }
}

/// Build the HTTP router over the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Push alert cues and sync progress to every WebSocket connection.
///
/// The returned tasks end when their source channel closes.
pub fn spawn_broadcasts(state: &AppState) -> Vec<JoinHandle<()>> {
    let mut cues = state.notifications.subscribe_cues();
    let manager = state.conn_manager.clone();
    let cue_task = tokio::spawn(async move {
        loop {
            match cues.recv().await {
                Ok(cue) => {
                    manager.broadcast_all(ServerMessage::AlertCue { cue });
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "alert cue broadcast lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut events = state.engine.subscribe_events();
    let manager = state.conn_manager.clone();
    let event_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    manager.broadcast_all(ServerMessage::SyncEvent { event });
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "sync event broadcast lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    vec![cue_task, event_task]
}
