//! Error types for the jobsync engine.

use crate::{PassKind, RecordId, SchemaVersion};
use thiserror::Error;

/// All possible errors from the jobsync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Lookup errors
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    // Input errors
    #[error("invalid value for '{field}': {value}")]
    InvalidField { field: String, value: String },

    // Sync pass errors
    #[error("a {0} pass is already in progress")]
    SyncInProgress(PassKind),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("schema version {actual} is newer than supported version {supported}")]
    SchemaTooNew {
        supported: SchemaVersion,
        actual: SchemaVersion,
    },
}

impl Error {
    /// Create an invalid field error.
    pub fn invalid_field(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::RecordNotFound("job-1".into());
        assert_eq!(err.to_string(), "record not found: job-1");

        let err = Error::SyncInProgress(PassKind::Delta);
        assert_eq!(err.to_string(), "a delta pass is already in progress");

        let err = Error::SchemaTooNew {
            supported: 3,
            actual: 7,
        };
        assert_eq!(
            err.to_string(),
            "schema version 7 is newer than supported version 3"
        );

        let err = Error::invalid_field("status", "archived");
        assert_eq!(err.to_string(), "invalid value for 'status': archived");
    }
}
