//! Incremental fetch of jobs changed since the watermark.

use jobsync_engine::PassKind;

use super::{upsert_remote_rows, Finished, SyncEngine};
use crate::error::Result;
use crate::remote::JobFetch;

impl SyncEngine {
    /// Fetch and store every job modified after the last watermark.
    ///
    /// Without a watermark this runs a bootstrap instead. The next watermark
    /// is read from the remote clock right before the fetch, so a row
    /// committed during the fetch is picked up by the following pass rather
    /// than skipped. Returns the number of cached records that changed.
    pub async fn delta(&self) -> Result<usize> {
        let Some(since) = self.local.read(|store| store.last_sync_time().cloned()).await else {
            tracing::info!("no sync watermark, running bootstrap instead of delta");
            return self.bootstrap().await;
        };

        let guard = self.begin(PassKind::Delta).await?;
        let outcome = self.run_delta(since).await;
        self.finish(guard, outcome).await
    }

    async fn run_delta(&self, since: jobsync_engine::Watermark) -> Result<Finished<usize>> {
        self.refresh_references().await?;

        let watermark = self.remote.current_watermark().await?;
        let rows = self
            .remote
            .fetch_jobs(&JobFetch::modified_after(since.clone()))
            .await?;
        let fetched = rows.len();
        let changed = upsert_remote_rows(&self.local, rows).await?;
        tracing::debug!(since = %since, fetched, changed, "delta fetched");

        Ok(Finished {
            watermark: Some(watermark),
            changed,
            value: changed,
        })
    }
}
