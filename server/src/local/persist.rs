//! Snapshot file persistence.

use std::path::{Path, PathBuf};

use jobsync_engine::{Store, StoreSnapshot};
use tokio::sync::Mutex;

/// Cache persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] jobsync_engine::Error),
}

/// The JSON file the cache is persisted to.
///
/// Saves are serialized and atomic: the snapshot is written next to the
/// target and renamed over it.
#[derive(Debug)]
pub struct SnapshotFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store, or an empty one if the file does not exist yet.
    pub async fn load(&self) -> Result<Store, PersistError> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no cache snapshot, starting empty");
                return Ok(Store::new());
            }
            Err(err) => return Err(err.into()),
        };

        let snapshot = StoreSnapshot::from_json(&json)?;
        let meta = snapshot.metadata();
        tracing::info!(
            path = %self.path.display(),
            jobs = meta.job_count,
            schema_version = meta.schema_version,
            "loaded cache snapshot"
        );
        Ok(Store::from_snapshot(snapshot))
    }

    /// Write a serialized snapshot.
    pub async fn save(&self, json: &str) -> Result<(), PersistError> {
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Held for the duration of one export-and-save.
    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}
