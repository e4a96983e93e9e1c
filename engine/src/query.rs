//! Filtering, pagination and filter-option derivation over cached jobs.
//!
//! Filters apply in a fixed order: status, branch, salesman, customer,
//! free-text search, creation-date range. Pagination runs on the filtered,
//! newest-first sequence.

use crate::enrich::is_placeholder;
use crate::{error::Result, CachedJobRecord, JobStatus, Store};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Filter value meaning "no filter".
pub const ANY: &str = "all";

/// Page size used when the caller does not give one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Filter criteria as supplied by the UI. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFilter {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub salesman: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
}

impl JobFilter {
    /// True when no criterion narrows the result.
    pub fn is_empty(&self) -> bool {
        [
            &self.status,
            &self.branch,
            &self.salesman,
            &self.customer,
            &self.search,
        ]
        .into_iter()
        .all(|v| criterion(v).is_none())
            && self.date_from.is_none()
            && self.date_to.is_none()
    }

    /// Check that every criterion is well-formed.
    pub fn validate(&self) -> Result<()> {
        self.compile().map(|_| ())
    }

    fn compile(&self) -> Result<Predicate> {
        let status = criterion(&self.status)
            .map(str::parse::<JobStatus>)
            .transpose()?;

        Ok(Predicate {
            status,
            branch: criterion(&self.branch).map(str::to_lowercase),
            salesman: criterion(&self.salesman).map(str::to_lowercase),
            customer: criterion(&self.customer).map(str::to_lowercase),
            search: criterion(&self.search).map(str::to_lowercase),
            date_from: self.date_from,
            date_to: self.date_to,
        })
    }
}

/// A filter value that actually narrows: not empty and not "all".
fn criterion(raw: &Option<String>) -> Option<&str> {
    let value = raw.as_deref()?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(ANY) {
        None
    } else {
        Some(value)
    }
}

/// Compiled form of a [`JobFilter`]; text criteria lowercased once.
#[derive(Debug)]
struct Predicate {
    status: Option<JobStatus>,
    branch: Option<String>,
    salesman: Option<String>,
    customer: Option<String>,
    search: Option<String>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
}

impl Predicate {
    fn apply<'a>(&self, jobs: Vec<&'a CachedJobRecord>) -> Vec<&'a CachedJobRecord> {
        let mut jobs = jobs;

        if let Some(status) = self.status {
            jobs.retain(|j| j.status == status);
        }
        if let Some(branch) = &self.branch {
            jobs.retain(|j| j.branch.to_lowercase() == *branch);
        }
        if let Some(salesman) = &self.salesman {
            jobs.retain(|j| j.salesman_name.to_lowercase() == *salesman);
        }
        if let Some(customer) = &self.customer {
            jobs.retain(|j| j.customer_name.to_lowercase() == *customer);
        }
        if let Some(needle) = &self.search {
            jobs.retain(|j| matches_search(j, needle));
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            jobs.retain(|j| self.in_date_range(j));
        }

        jobs
    }

    fn in_date_range(&self, job: &CachedJobRecord) -> bool {
        let Some(created) = job.created_at.date() else {
            return false;
        };
        self.date_from.map_or(true, |from| created >= from)
            && self.date_to.map_or(true, |to| created <= to)
    }
}

fn matches_search(job: &CachedJobRecord, needle: &str) -> bool {
    let contains = |haystack: &str| haystack.to_lowercase().contains(needle);

    contains(&job.jo_number)
        || contains(&job.details_plain)
        || contains(&job.details)
        || contains(&job.client_name)
        || job.assignee.as_deref().is_some_and(contains)
        || contains(&job.customer_name)
}

/// Which slice of the filtered result to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
    /// Return every matching record and ignore `page`/`page_size`.
    #[serde(default)]
    pub all: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            all: false,
        }
    }
}

impl Pagination {
    pub fn page(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size,
            all: false,
        }
    }

    pub fn unpaginated() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.max(1),
            all: self.all,
        }
    }
}

/// Distinct values for filter-selection UIs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub salesmen: Vec<String>,
    pub customers: Vec<String>,
    pub branches: Vec<String>,
}

impl FilterOptions {
    /// Derive option lists; placeholders are excluded, values sorted and unique.
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a CachedJobRecord>) -> Self {
        let mut salesmen = BTreeSet::new();
        let mut customers = BTreeSet::new();
        let mut branches = BTreeSet::new();

        for job in jobs {
            for (set, value) in [
                (&mut salesmen, &job.salesman_name),
                (&mut customers, &job.customer_name),
                (&mut branches, &job.branch),
            ] {
                if !is_placeholder(value) {
                    set.insert(value.trim().to_string());
                }
            }
        }

        Self {
            salesmen: salesmen.into_iter().collect(),
            customers: customers.into_iter().collect(),
            branches: branches.into_iter().collect(),
        }
    }
}

/// One page of a job query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPage {
    pub items: Vec<CachedJobRecord>,
    /// Number of records matching the filter
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    /// Derived from the unfiltered cache
    pub options: FilterOptions,
}

/// Builder for querying cached jobs.
#[derive(Debug)]
pub struct JobQuery<'a> {
    store: &'a Store,
    filter: JobFilter,
    pagination: Pagination,
}

impl<'a> JobQuery<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self {
            store,
            filter: JobFilter::default(),
            pagination: Pagination::default(),
        }
    }

    /// Narrow by the given filter.
    pub fn filter(mut self, filter: JobFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Select a page.
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Every matching record, newest first.
    pub fn matching(&self) -> Result<Vec<&'a CachedJobRecord>> {
        let predicate = self.filter.compile()?;
        Ok(predicate.apply(self.store.jobs_newest_first()))
    }

    /// Count matching records.
    pub fn count(&self) -> Result<usize> {
        Ok(self.matching()?.len())
    }

    /// Evaluate the query into a page with option lists.
    pub fn run(self) -> Result<JobPage> {
        let matching = self.matching()?;
        let total = matching.len();
        let Pagination {
            page,
            page_size,
            all,
        } = self.pagination.normalized();

        let (items, page, page_size, total_pages) = if all {
            let items: Vec<_> = matching.into_iter().cloned().collect();
            (items, 1, total.max(1), usize::from(total > 0))
        } else {
            let items = matching
                .into_iter()
                .skip((page - 1).saturating_mul(page_size))
                .take(page_size)
                .cloned()
                .collect();
            (items, page, page_size, total.div_ceil(page_size))
        };

        Ok(JobPage {
            items,
            total,
            page,
            page_size,
            total_pages,
            options: FilterOptions::from_jobs(self.store.jobs()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{UNASSIGNED, UNKNOWN_CUSTOMER};
    use crate::{Error, Priority, Watermark};

    fn job(id: &str, created: &str) -> CachedJobRecord {
        CachedJobRecord {
            id: id.into(),
            jo_number: format!("JO-{}", id),
            customer_id: None,
            customer_name: "ACME Printing".into(),
            salesman_id: None,
            salesman_name: "Maria".into(),
            designer_id: None,
            designer_name: UNASSIGNED.into(),
            job_title_id: None,
            job_title: "Tarpaulin".into(),
            client_name: "Walk-in".into(),
            assignee: None,
            status: JobStatus::Pending,
            priority: Priority::Normal,
            branch: "Main".into(),
            due_date: None,
            estimated_hours: None,
            actual_hours: None,
            total_amount: 0.0,
            invoice_number: None,
            details: String::new(),
            details_plain: String::new(),
            approval_status: Default::default(),
            approved_by: None,
            approved_at: None,
            created_at: Watermark::parse(created),
            updated_at: Watermark::parse(created),
        }
    }

    fn sample_store() -> Store {
        let mut a = job("a", "2024-03-01T08:00:00Z");
        a.details_plain = "Full color tarpaulin 3x6".into();

        let mut b = job("b", "2024-03-02T09:00:00Z");
        b.status = JobStatus::InProgress;
        b.customer_name = "Globex".into();
        b.branch = "North".into();

        let mut c = job("c", "2024-03-03T10:00:00Z");
        c.salesman_name = UNASSIGNED.into();
        c.customer_name = UNKNOWN_CUSTOMER.into();
        c.client_name = "acme walk-in".into();

        let mut d = job("d", "2024-03-04T23:59:59Z");
        d.status = JobStatus::Completed;
        d.assignee = Some("Jun".into());

        let mut store = Store::new();
        store.upsert_jobs([a, b, c, d]);
        store
    }

    fn ids(page: &JobPage) -> Vec<&str> {
        page.items.iter().map(|j| j.id.as_str()).collect()
    }

    #[test]
    fn empty_filter_returns_newest_first() {
        let store = sample_store();
        let page = store.query_jobs().run().unwrap();
        assert_eq!(ids(&page), vec!["d", "c", "b", "a"]);
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn all_means_no_filter() {
        let store = sample_store();
        let filter = JobFilter {
            status: Some("ALL".into()),
            branch: Some("  ".into()),
            ..JobFilter::default()
        };
        assert!(filter.is_empty());
        assert_eq!(store.query_jobs().filter(filter).count().unwrap(), 4);
    }

    #[test]
    fn status_and_search_compose() {
        let store = sample_store();
        let filter = JobFilter {
            status: Some("pending".into()),
            search: Some("acme".into()),
            ..JobFilter::default()
        };
        let page = store.query_jobs().filter(filter).run().unwrap();
        // a: customer matches, c: client name matches
        assert_eq!(ids(&page), vec!["c", "a"]);
    }

    #[test]
    fn search_covers_details_and_assignee() {
        let store = sample_store();
        let by_details = JobFilter {
            search: Some("TARPAULIN 3X6".into()),
            ..JobFilter::default()
        };
        let by_assignee = JobFilter {
            search: Some("jun".into()),
            ..JobFilter::default()
        };
        let by_number = JobFilter {
            search: Some("jo-b".into()),
            ..JobFilter::default()
        };
        assert_eq!(ids(&store.query_jobs().filter(by_details).run().unwrap()), vec!["a"]);
        assert_eq!(ids(&store.query_jobs().filter(by_assignee).run().unwrap()), vec!["d"]);
        assert_eq!(ids(&store.query_jobs().filter(by_number).run().unwrap()), vec!["b"]);
    }

    #[test]
    fn branch_and_customer_are_case_insensitive_equality() {
        let store = sample_store();
        let filter = JobFilter {
            branch: Some("north".into()),
            customer: Some("GLOBEX".into()),
            ..JobFilter::default()
        };
        assert_eq!(ids(&store.query_jobs().filter(filter).run().unwrap()), vec!["b"]);

        let partial = JobFilter {
            customer: Some("Glob".into()),
            ..JobFilter::default()
        };
        assert_eq!(store.query_jobs().filter(partial).count().unwrap(), 0);
    }

    #[test]
    fn date_range_is_inclusive() {
        let store = sample_store();
        let filter = JobFilter {
            date_from: NaiveDate::from_ymd_opt(2024, 3, 2),
            date_to: NaiveDate::from_ymd_opt(2024, 3, 4),
            ..JobFilter::default()
        };
        assert_eq!(
            ids(&store.query_jobs().filter(filter).run().unwrap()),
            vec!["d", "c", "b"]
        );
    }

    #[test]
    fn invalid_status_is_rejected() {
        let store = sample_store();
        let filter = JobFilter {
            status: Some("archived".into()),
            ..JobFilter::default()
        };
        assert!(matches!(
            store.query_jobs().filter(filter).run(),
            Err(Error::InvalidField { .. })
        ));
    }

    #[test]
    fn pagination_bounds() {
        let store = sample_store();

        let page = store
            .query_jobs()
            .paginate(Pagination::page(2, 3))
            .run()
            .unwrap();
        assert_eq!(ids(&page), vec!["a"]);
        assert_eq!(page.total_pages, 2);

        let past_end = store
            .query_jobs()
            .paginate(Pagination::page(9, 3))
            .run()
            .unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 4);

        let clamped = store
            .query_jobs()
            .paginate(Pagination::page(0, 0))
            .run()
            .unwrap();
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.page_size, 1);
        assert_eq!(ids(&clamped), vec!["d"]);
        assert_eq!(clamped.total_pages, 4);
    }

    #[test]
    fn unpaginated_returns_everything() {
        let store = sample_store();
        let page = store
            .query_jobs()
            .paginate(Pagination {
                page: 5,
                page_size: 1,
                all: true,
            })
            .run()
            .unwrap();
        assert_eq!(page.items.len(), 4);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn options_come_from_unfiltered_set() {
        let store = sample_store();
        let filter = JobFilter {
            branch: Some("North".into()),
            ..JobFilter::default()
        };
        let page = store.query_jobs().filter(filter).run().unwrap();

        assert_eq!(page.options.branches, vec!["Main", "North"]);
        assert_eq!(page.options.customers, vec!["ACME Printing", "Globex"]);
        assert_eq!(page.options.salesmen, vec!["Maria"]);
    }

    #[test]
    fn empty_cache_has_no_pages() {
        let store = Store::new();
        let page = store.query_jobs().run().unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.options, FilterOptions::default());
    }
}
