//! Cached job endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use jobsync_engine::{CachedJobRecord, FilterOptions, JobPage};

use crate::error::{AppError, Result};
use crate::handlers::JobsQuery;
use crate::live::job_page;
use crate::AppState;

/// Create job routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_handler))
        .route("/jobs/options", get(options_handler))
        .route("/jobs/{id}", get(get_handler))
        .route("/jobs/{id}/refresh", post(refresh_handler))
}

/// GET /jobs - Filtered, paginated job list.
async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<JobPage>> {
    let view = query.into_view()?;
    Ok(Json(job_page(state.engine.local(), &view).await?))
}

/// GET /jobs/options - Filter values over the whole cache.
async fn options_handler(State(state): State<AppState>) -> Json<FilterOptions> {
    let options = state
        .engine
        .local()
        .read(|store| FilterOptions::from_jobs(store.jobs()))
        .await;
    Json(options)
}

/// GET /jobs/{id} - One cached job.
async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CachedJobRecord>> {
    state
        .engine
        .local()
        .read(|store| store.job(&id).cloned())
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("job {}", id)))
}

/// POST /jobs/{id}/refresh - Re-read one job from the remote.
async fn refresh_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CachedJobRecord>> {
    state
        .engine
        .refresh_job(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("job {} no longer exists", id)))
}
