//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::local::PersistError;
use crate::remote::RemoteError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Engine error: {0}")]
    Engine(#[from] jobsync_engine::Error),

    #[error("Cache persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// True when the error is the pass-overlap guard refusing a pass.
    pub fn is_sync_in_progress(&self) -> bool {
        matches!(self, AppError::Engine(jobsync_engine::Error::SyncInProgress(_)))
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use jobsync_engine::Error as EngineError;

        let (status, error_message, details) = match &self {
            AppError::Remote(e) => {
                tracing::warn!("Remote error: {:?}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "Remote store unavailable".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::Engine(e) => match e {
                EngineError::SyncInProgress(_) => (StatusCode::CONFLICT, e.to_string(), None),
                EngineError::RecordNotFound(_) => (StatusCode::NOT_FOUND, e.to_string(), None),
                EngineError::InvalidField { .. } => (StatusCode::BAD_REQUEST, e.to_string(), None),
                EngineError::InvalidSnapshot(_) | EngineError::SchemaTooNew { .. } => {
                    tracing::error!("Engine error: {:?}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Cache state error".to_string(),
                        Some(e.to_string()),
                    )
                }
            },
            AppError::Persist(e) => {
                tracing::error!("Persistence error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Cache persistence error".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers and sync passes.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use jobsync_engine::PassKind;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_of(jobsync_engine::Error::SyncInProgress(PassKind::Delta).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(jobsync_engine::Error::RecordNotFound("x".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(jobsync_engine::Error::invalid_field("status", "archived").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RemoteError::Unavailable("timeout".into()).into()),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn detects_guard_refusal() {
        let err: AppError = jobsync_engine::Error::SyncInProgress(PassKind::Repair).into();
        assert!(err.is_sync_in_progress());
        assert!(!AppError::BadRequest("x".into()).is_sync_in_progress());
    }
}
