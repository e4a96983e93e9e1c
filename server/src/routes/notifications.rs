//! Notification endpoints for the current user.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use jobsync_engine::NotificationView;
use serde::Serialize;

use crate::error::Result;
use crate::AppState;

/// Number of notifications a bulk action touched.
#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub updated: usize,
}

/// Create notification routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(view_handler))
        .route("/notifications/ack-all", post(acknowledge_all_handler))
        .route("/notifications/snooze-all", post(snooze_all_handler))
        .route("/notifications/{id}/ack", post(acknowledge_handler))
        .route("/notifications/{id}/snooze", post(snooze_handler))
}

/// GET /notifications - Active notifications and recent history.
async fn view_handler(State(state): State<AppState>) -> Json<NotificationView> {
    Json(state.notifications.view().await)
}

async fn acknowledge_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NotificationView>> {
    state.notifications.acknowledge(&id).await?;
    Ok(Json(state.notifications.view().await))
}

async fn snooze_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NotificationView>> {
    state.notifications.snooze(&id).await?;
    Ok(Json(state.notifications.view().await))
}

async fn acknowledge_all_handler(State(state): State<AppState>) -> Result<Json<BulkResponse>> {
    let updated = state.notifications.acknowledge_all().await?;
    Ok(Json(BulkResponse { updated }))
}

async fn snooze_all_handler(State(state): State<AppState>) -> Result<Json<BulkResponse>> {
    let updated = state.notifications.snooze_all().await?;
    Ok(Json(BulkResponse { updated }))
}
