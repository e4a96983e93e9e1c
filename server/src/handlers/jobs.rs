//! Job list request parsing.

use chrono::NaiveDate;
use jobsync_engine::{JobFilter, Pagination, DEFAULT_PAGE_SIZE};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::live::JobView;

/// Raw `GET /jobs` query parameters.
///
/// Everything arrives as a string so malformed values produce a 400 with
/// a useful message instead of a generic rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsQuery {
    pub status: Option<String>,
    pub branch: Option<String>,
    pub salesman: Option<String>,
    pub customer: Option<String>,
    pub search: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub all: Option<String>,
}

impl JobsQuery {
    pub fn into_view(self) -> Result<JobView> {
        let filter = JobFilter {
            status: self.status,
            branch: self.branch,
            salesman: self.salesman,
            customer: self.customer,
            search: self.search,
            date_from: parse_date("dateFrom", self.date_from)?,
            date_to: parse_date("dateTo", self.date_to)?,
        };
        filter.validate()?;

        let pagination = Pagination {
            page: parse_number("page", self.page)?.unwrap_or(1),
            page_size: parse_number("pageSize", self.page_size)?.unwrap_or(DEFAULT_PAGE_SIZE),
            all: parse_flag("all", self.all)?,
        };

        Ok(JobView { filter, pagination })
    }
}

fn present(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_date(name: &str, raw: Option<String>) -> Result<Option<NaiveDate>> {
    present(raw)
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|_| AppError::BadRequest(format!("{} must be YYYY-MM-DD, got {:?}", name, s)))
        })
        .transpose()
}

fn parse_number(name: &str, raw: Option<String>) -> Result<Option<usize>> {
    present(raw)
        .map(|s| {
            s.parse()
                .map_err(|_| AppError::BadRequest(format!("{} must be a number, got {:?}", name, s)))
        })
        .transpose()
}

fn parse_flag(name: &str, raw: Option<String>) -> Result<bool> {
    match present(raw).as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("false") | Some("0") => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some(other) => Err(AppError::BadRequest(format!(
            "{} must be true or false, got {:?}",
            name, other
        ))),
    }
}
