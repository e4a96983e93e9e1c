//! Health check endpoint.

use axum::{extract::State, routing::get, Json, Router};
use jobsync_engine::Watermark;
use serde::Serialize;

use crate::AppState;

/// Health check response.
///
/// `degraded` means the last sync pass failed; cached data is still served.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cached_jobs: usize,
    pub last_sync_time: Option<Watermark>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub background_sync: bool,
}

/// Create health routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.engine.status().await;
    Json(HealthResponse {
        status: if status.meta.last_error.is_some() {
            "degraded"
        } else {
            "ok"
        }
        .to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_jobs: status.cached_jobs,
        last_sync_time: status.meta.last_sync_time,
        last_error: status.meta.last_error,
        background_sync: state.scheduler.is_running(),
    })
}

/// Root handler.
async fn root() -> &'static str {
    "Jobsync Server"
}
