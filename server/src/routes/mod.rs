//! HTTP route definitions.

mod health;
mod jobs;
mod notifications;
mod sync;
mod ws;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(sync::routes())
        .merge(jobs::routes())
        .merge(notifications::routes())
        .merge(ws::routes())
}
