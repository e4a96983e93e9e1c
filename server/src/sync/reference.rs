//! Wholesale refresh of the lookup tables.

use jobsync_engine::{ReferenceData, StaffRole};

use crate::error::Result;
use crate::local::LocalStore;
use crate::remote::RemoteSource;

/// Staff roles that are cached: anyone who can sell or design.
fn cached_roles() -> Vec<StaffRole> {
    let mut roles: Vec<StaffRole> = StaffRole::SALES.into_iter().collect();
    roles.extend(StaffRole::DESIGN);
    roles
}

/// Replace the reference tables with a complete remote read, then
/// re-resolve display names on cached jobs.
///
/// Returns how many cached jobs were relabeled.
pub(crate) async fn refresh_references(
    remote: &dyn RemoteSource,
    local: &LocalStore,
) -> Result<usize> {
    let roles = cached_roles();
    let (customers, staff, job_titles) = tokio::try_join!(
        remote.fetch_customers(),
        remote.fetch_staff(&roles),
        remote.fetch_job_titles(),
    )?;

    tracing::debug!(
        customers = customers.len(),
        staff = staff.len(),
        job_titles = job_titles.len(),
        "reference data fetched"
    );

    let data = ReferenceData::from_staff(customers, staff, job_titles);
    let relabeled = local
        .write(move |store| {
            store.replace_references(data);
            store.relabel_jobs()
        })
        .await?;

    if relabeled > 0 {
        tracing::info!(relabeled, "cached jobs relabeled after reference refresh");
    }
    Ok(relabeled)
}
