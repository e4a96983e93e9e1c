//! First full load of the job table.

use jobsync_engine::PassKind;

use super::{upsert_remote_rows, Finished, SyncEngine};
use crate::error::Result;
use crate::remote::JobFetch;

impl SyncEngine {
    /// Load every remote job in fixed-size batches, newest first.
    ///
    /// The watermark is taken from the remote clock before the first batch
    /// and recorded only once every batch is stored. A failed batch aborts
    /// the pass with the watermark untouched, so the retry redoes the work.
    /// Returns the number of rows loaded.
    pub async fn bootstrap(&self) -> Result<usize> {
        let guard = self.begin(PassKind::Bootstrap).await?;
        let outcome = self.run_bootstrap().await;
        self.finish(guard, outcome).await
    }

    pub(super) async fn run_bootstrap(&self) -> Result<Finished<usize>> {
        self.refresh_references().await?;

        let watermark = self.remote.current_watermark().await?;
        let expected = self.remote.count_jobs().await?;
        let batch_size = self.config.bootstrap_batch_size.max(1);
        tracing::info!(expected, batch_size, "bootstrap started");

        let mut offset = 0;
        let mut loaded = 0;
        let mut changed = 0;
        loop {
            let rows = self
                .remote
                .fetch_jobs(&JobFetch::batch(offset, batch_size))
                .await?;
            let count = rows.len();
            loaded += count;
            changed += upsert_remote_rows(&self.local, rows).await?;
            tracing::debug!(offset, count, loaded, "bootstrap batch stored");

            // rows inserted mid-pass shift later batches; a short batch is
            // the only reliable end marker
            if count < batch_size {
                break;
            }
            offset += batch_size;
        }

        if loaded != expected {
            tracing::warn!(expected, loaded, "remote row count changed during bootstrap");
        }

        Ok(Finished {
            watermark: Some(watermark),
            changed,
            value: loaded,
        })
    }
}
