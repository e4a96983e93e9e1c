//! The live, filtered, paginated job list.

use jobsync_engine::{JobFilter, JobPage, Pagination, Table};
use serde::{Deserialize, Serialize};

use super::LiveQuery;
use crate::error::Result;
use crate::local::LocalStore;

/// What a caller wants to see of the job list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    #[serde(default)]
    pub filter: JobFilter,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Evaluate a job view once.
pub async fn job_page(local: &LocalStore, view: &JobView) -> Result<JobPage> {
    let page = local
        .read(|store| {
            store
                .query_jobs()
                .filter(view.filter.clone())
                .paginate(view.pagination)
                .run()
        })
        .await?;
    Ok(page)
}

/// A job view that follows every change to the job table.
///
/// Invalid filters are rejected up front.
pub async fn live_jobs(local: &LocalStore, view: JobView) -> Result<LiveQuery<JobPage>> {
    view.filter.validate()?;
    LiveQuery::spawn(local.clone(), &[Table::Jobs], None, move |store| {
        store
            .query_jobs()
            .filter(view.filter.clone())
            .paginate(view.pagination)
            .run()
    })
    .await
}
