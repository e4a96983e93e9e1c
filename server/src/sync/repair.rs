//! The convergence backstop: diff remote ids against the cache.

use std::collections::HashSet;

use jobsync_engine::{PassKind, RepairPlan, RepairReport, Store};

use super::{upsert_remote_rows, Finished, SyncEngine};
use crate::error::Result;
use crate::remote::JobFetch;

impl SyncEngine {
    /// Re-fetch jobs that are missing or stale in the cache and, when
    /// pruning is enabled, drop cached jobs that no longer exist remotely.
    ///
    /// Costs one id-only read of the whole remote table, so it runs once per
    /// session rather than on every tick. Never moves the watermark.
    pub async fn repair(&self) -> Result<RepairReport> {
        let guard = self.begin(PassKind::Repair).await?;
        let outcome = self.run_repair().await;
        self.finish(guard, outcome).await
    }

    async fn run_repair(&self) -> Result<Finished<RepairReport>> {
        let remote_versions = self.remote.fetch_jobs(&JobFetch::all_versions()).await?;
        let local_versions = self.local.read(Store::job_versions).await;
        let plan = RepairPlan::compute(&local_versions, &remote_versions);

        tracing::info!(
            remote = remote_versions.len(),
            cached = local_versions.len(),
            missing = plan.missing.len(),
            stale = plan.stale.len(),
            orphans = plan.orphans.len(),
            "repair plan computed"
        );

        let mut report = RepairReport::default();
        let batches = plan.fetch_batches(self.config.repair_batch_size);

        if !batches.is_empty() {
            self.refresh_references().await?;

            let missing: HashSet<&str> = plan.missing.iter().map(String::as_str).collect();
            for batch in batches {
                let rows = self.remote.fetch_jobs(&JobFetch::by_ids(batch)).await?;
                for row in &rows {
                    if missing.contains(row.id.as_str()) {
                        report.repaired += 1;
                    } else {
                        report.stale_refreshed += 1;
                    }
                }
                upsert_remote_rows(&self.local, rows).await?;
            }
        }

        if !plan.orphans.is_empty() {
            if self.config.prune_deleted {
                let orphans = plan.orphans;
                report.pruned = self
                    .local
                    .write(move |store| store.remove_jobs(&orphans))
                    .await?;
            } else {
                tracing::debug!(
                    orphans = plan.orphans.len(),
                    "pruning disabled, keeping jobs deleted remotely"
                );
            }
        }

        Ok(Finished {
            watermark: None,
            changed: report.changed(),
            value: report,
        })
    }
}
