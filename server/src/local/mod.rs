//! The shared, persistent handle to the local cache.
//!
//! [`LocalStore`] wraps the engine's in-memory [`Store`] behind an async
//! `RwLock`. Every write that changes a table publishes the new per-table
//! revisions on a `watch` channel (which is what live queries wait on) and,
//! when the store is file-backed, saves a snapshot before returning.

mod persist;

pub use persist::{PersistError, SnapshotFile};

use std::path::PathBuf;
use std::sync::Arc;

use jobsync_engine::{Revisions, Store};
use tokio::sync::{watch, RwLock};

#[derive(Debug)]
struct Inner {
    store: RwLock<Store>,
    revisions: watch::Sender<Revisions>,
    file: Option<SnapshotFile>,
}

/// Cheaply cloneable handle to the cache.
#[derive(Debug, Clone)]
pub struct LocalStore {
    inner: Arc<Inner>,
}

impl LocalStore {
    fn from_store(store: Store, file: Option<SnapshotFile>) -> Self {
        let (revisions, _) = watch::channel(store.revisions());
        Self {
            inner: Arc::new(Inner {
                store: RwLock::new(store),
                revisions,
                file,
            }),
        }
    }

    /// A cache that lives only in memory.
    pub fn in_memory() -> Self {
        Self::from_store(Store::new(), None)
    }

    /// Open (or create) a file-backed cache.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let file = SnapshotFile::new(path);
        let store = file.load().await?;
        Ok(Self::from_store(store, Some(file)))
    }

    /// Run a read-only closure against the store.
    pub async fn read<R>(&self, f: impl FnOnce(&Store) -> R) -> R {
        let store = self.inner.store.read().await;
        f(&store)
    }

    /// Run a mutating closure against the store.
    ///
    /// If any table changed, subscribers are notified and the snapshot is
    /// saved before this returns.
    pub async fn write<R>(&self, f: impl FnOnce(&mut Store) -> R) -> Result<R, PersistError> {
        let (result, changed) = {
            let mut store = self.inner.store.write().await;
            let before = store.revisions();
            let result = f(&mut store);
            let after = store.revisions();
            if after != before {
                self.inner.revisions.send_replace(after);
            }
            (result, after != before)
        };

        if changed {
            self.persist().await?;
        }
        Ok(result)
    }

    /// Save a snapshot now. No-op for in-memory caches.
    pub async fn persist(&self) -> Result<(), PersistError> {
        let Some(file) = &self.inner.file else {
            return Ok(());
        };

        let _guard = file.lock().await;
        let json = {
            let store = self.inner.store.read().await;
            store.export_state().to_json()?
        };
        file.save(&json).await?;
        tracing::trace!(path = %file.path().display(), bytes = json.len(), "cache snapshot saved");
        Ok(())
    }

    /// Watch per-table revisions.
    pub fn subscribe(&self) -> watch::Receiver<Revisions> {
        self.inner.revisions.subscribe()
    }

    pub async fn needs_bootstrap(&self) -> bool {
        self.read(Store::needs_bootstrap).await
    }

    pub async fn job_count(&self) -> usize {
        self.read(Store::job_count).await
    }
}
