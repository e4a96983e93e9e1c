//! Sync passes that keep the cache converging on the remote store.
//!
//! All passes that write the job table in bulk (bootstrap, delta, repair,
//! full resync) are mutually exclusive through the store's in-progress
//! flag; see [`PassGuard`](guard::PassGuard). Every pass, and the single
//! record refresh, writes jobs through one path: enrich against the current
//! reference tables, then upsert.
//!
//! ```text
//! start_session ─┬─ cache empty ──> bootstrap ─┐
//!                └─ otherwise ───> delta ──────┴─> repair (once) ─> scheduler
//! ```

mod bootstrap;
mod delta;
mod guard;
mod reference;
mod repair;
mod scheduler;

pub use scheduler::BackgroundScheduler;

use std::sync::Arc;

use jobsync_engine::{
    CachedJobRecord, Enricher, PassKind, RemoteJobRow, Store, SyncMetadata, Watermark,
};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::SyncConfig;
use crate::error::Result;
use crate::local::LocalStore;
use crate::remote::RemoteSource;

use guard::PassGuard;

const EVENT_CAPACITY: usize = 64;

/// Progress of sync passes, for UI status indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncEvent {
    Started { pass: PassKind },
    Completed { pass: PassKind, changed: usize },
    Failed { pass: PassKind, error: String },
}

/// Snapshot of sync state served by the status endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    #[serde(flatten)]
    pub meta: SyncMetadata,
    pub cached_jobs: usize,
    pub needs_bootstrap: bool,
}

/// What a pass body hands back to [`SyncEngine::finish`].
struct Finished<T> {
    watermark: Option<Watermark>,
    changed: usize,
    value: T,
}

/// Runs sync passes against one remote and one cache.
#[derive(Clone)]
pub struct SyncEngine {
    remote: Arc<dyn RemoteSource>,
    local: LocalStore,
    config: SyncConfig,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncEngine {
    pub fn new(remote: Arc<dyn RemoteSource>, local: LocalStore, config: SyncConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            remote,
            local,
            config,
            events,
        }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub async fn needs_bootstrap(&self) -> bool {
        self.local.needs_bootstrap().await
    }

    pub async fn status(&self) -> SyncStatus {
        self.local
            .read(|store| SyncStatus {
                meta: store.sync_meta().clone(),
                cached_jobs: store.job_count(),
                needs_bootstrap: store.needs_bootstrap(),
            })
            .await
    }

    /// Startup sequence: bootstrap or delta, then one repair.
    ///
    /// Failures are logged; the cache stays readable either way.
    pub async fn start_session(&self) {
        let first = if self.needs_bootstrap().await {
            self.bootstrap().await
        } else {
            self.delta().await
        };
        if let Err(err) = first {
            tracing::warn!(error = %err, "initial sync failed, serving cached data");
        }

        if self.config.repair_on_startup {
            if let Err(err) = self.repair().await {
                tracing::warn!(error = %err, "startup repair failed");
            }
        }
    }

    /// Drop every cached table and bootstrap from scratch.
    ///
    /// The guard is held across the clear, so no other pass can observe
    /// the empty cache.
    pub async fn force_full_resync(&self) -> Result<usize> {
        let guard = self.begin(PassKind::FullResync).await?;
        tracing::warn!("clearing cache for full resync");
        let outcome = match self.local.write(Store::clear_all).await {
            Ok(()) => self.run_bootstrap().await,
            Err(err) => Err(err.into()),
        };
        self.finish(guard, outcome).await
    }

    /// Re-read one job after a local mutation.
    ///
    /// Not guarded: it writes through the same upsert path as the passes,
    /// and a single-record upsert is safe to interleave with them. If the
    /// job no longer exists remotely, the cached copy is removed.
    pub async fn refresh_job(&self, id: &str) -> Result<Option<CachedJobRecord>> {
        match self.remote.fetch_job(id).await? {
            Some(row) => {
                upsert_remote_rows(&self.local, vec![row]).await?;
                let id = id.to_string();
                Ok(self.local.read(move |store| store.job(&id).cloned()).await)
            }
            None => {
                let ids = vec![id.to_string()];
                let removed = self.local.write(move |store| store.remove_jobs(&ids)).await?;
                if removed > 0 {
                    tracing::info!(job_id = %id, "job gone remotely, removed from cache");
                }
                Ok(None)
            }
        }
    }

    async fn refresh_references(&self) -> Result<usize> {
        reference::refresh_references(self.remote.as_ref(), &self.local).await
    }

    async fn begin(&self, kind: PassKind) -> Result<PassGuard> {
        let guard = PassGuard::acquire(&self.local, kind).await?;
        tracing::debug!(pass = %kind, "sync pass started");
        let _ = self.events.send(SyncEvent::Started { pass: kind });
        Ok(guard)
    }

    async fn finish<T>(&self, guard: PassGuard, outcome: Result<Finished<T>>) -> Result<T> {
        let kind = guard.kind();
        match outcome {
            Ok(done) => {
                guard.complete(done.watermark, done.changed).await?;
                tracing::info!(pass = %kind, changed = done.changed, "sync pass complete");
                let _ = self.events.send(SyncEvent::Completed {
                    pass: kind,
                    changed: done.changed,
                });
                Ok(done.value)
            }
            Err(err) => {
                tracing::warn!(pass = %kind, error = %err, "sync pass failed");
                if let Err(release) = guard.fail(err.to_string()).await {
                    tracing::error!(error = %release, "failed to record sync failure");
                }
                let _ = self.events.send(SyncEvent::Failed {
                    pass: kind,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

/// Enrich remote rows against the current reference tables and upsert them.
///
/// Enrichment happens under the same write lock as the upsert, so it always
/// sees the reference tables the pass just stored.
pub(crate) async fn upsert_remote_rows(local: &LocalStore, rows: Vec<RemoteJobRow>) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }
    let changed = local
        .write(move |store| {
            let records = Enricher::new(store.references()).enrich_batch(rows);
            store.upsert_jobs(records)
        })
        .await?;
    Ok(changed)
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
