//! Sync control endpoints.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use jobsync_engine::RepairReport;
use serde::Serialize;

use crate::error::Result;
use crate::sync::SyncStatus;
use crate::AppState;

/// Outcome of a loading pass.
#[derive(Debug, Serialize)]
pub struct PassResponse {
    /// Rows loaded (bootstrap) or records changed (delta)
    pub count: usize,
}

/// Scheduler state after a start/stop request.
#[derive(Debug, Serialize)]
pub struct BackgroundResponse {
    /// Whether this request changed the state
    pub changed: bool,
    pub running: bool,
}

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync/status", get(status_handler))
        .route("/sync/bootstrap", post(bootstrap_handler))
        .route("/sync/delta", post(delta_handler))
        .route("/sync/repair", post(repair_handler))
        .route("/sync/resync", post(resync_handler))
        .route("/sync/background/start", post(start_background_handler))
        .route("/sync/background/stop", post(stop_background_handler))
}

/// GET /sync/status - Watermark, guard and last pass.
async fn status_handler(State(state): State<AppState>) -> Json<SyncStatus> {
    Json(state.engine.status().await)
}

/// POST /sync/bootstrap - Full load.
async fn bootstrap_handler(State(state): State<AppState>) -> Result<Json<PassResponse>> {
    let count = state.engine.bootstrap().await?;
    Ok(Json(PassResponse { count }))
}

/// POST /sync/delta - Incremental fetch.
async fn delta_handler(State(state): State<AppState>) -> Result<Json<PassResponse>> {
    let count = state.engine.delta().await?;
    Ok(Json(PassResponse { count }))
}

/// POST /sync/repair - Identifier diff against the remote.
async fn repair_handler(State(state): State<AppState>) -> Result<Json<RepairReport>> {
    Ok(Json(state.engine.repair().await?))
}

/// POST /sync/resync - Clear the cache and bootstrap again.
async fn resync_handler(State(state): State<AppState>) -> Result<Json<PassResponse>> {
    let count = state.resync().await?;
    Ok(Json(PassResponse { count }))
}

async fn start_background_handler(State(state): State<AppState>) -> Json<BackgroundResponse> {
    let changed = state.scheduler.start();
    Json(BackgroundResponse {
        changed,
        running: state.scheduler.is_running(),
    })
}

async fn stop_background_handler(State(state): State<AppState>) -> Json<BackgroundResponse> {
    let changed = state.scheduler.stop();
    Json(BackgroundResponse {
        changed,
        running: state.scheduler.is_running(),
    })
}
