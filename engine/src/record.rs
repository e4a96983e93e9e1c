//! Job-order record types.
//!
//! [`RemoteJobRow`] is the raw shape read from the remote store, with bare
//! foreign keys. [`CachedJobRecord`] is the denormalised unit of replication
//! held in the local `jobs` table.

use crate::{error::Result, Error, RecordId, Watermark};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowercase and fold spaces/dashes to underscores for lenient enum parsing.
fn normalize_token(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Workflow status of a job order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    InProgress,
    ForApproval,
    Completed,
    Delivered,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Pending,
        JobStatus::InProgress,
        JobStatus::ForApproval,
        JobStatus::Completed,
        JobStatus::Delivered,
        JobStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::ForApproval => "for_approval",
            JobStatus::Completed => "completed",
            JobStatus::Delivered => "delivered",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let token = normalize_token(raw);
        match token.as_str() {
            "canceled" => return Ok(JobStatus::Cancelled),
            "done" => return Ok(JobStatus::Completed),
            _ => {}
        }
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == token)
            .ok_or_else(|| Error::invalid_field("status", raw))
    }
}

/// Scheduling priority of a job order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match normalize_token(raw).as_str() {
            "low" => Ok(Priority::Low),
            "normal" | "medium" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" | "rush" => Ok(Priority::Urgent),
            _ => Err(Error::invalid_field("priority", raw)),
        }
    }
}

/// Approval state of a job order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match normalize_token(raw).as_str() {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" | "declined" => Ok(ApprovalStatus::Rejected),
            _ => Err(Error::invalid_field("approval_status", raw)),
        }
    }
}

/// A job-order row as read from the remote store.
///
/// Rows fetched with the minimal shape only carry `id` and `updated_at`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteJobRow {
    pub id: RecordId,
    pub jo_number: Option<String>,
    pub customer_id: Option<RecordId>,
    pub salesman_id: Option<RecordId>,
    pub designer_id: Option<RecordId>,
    pub job_title_id: Option<RecordId>,
    pub client_name: Option<String>,
    pub assignee: Option<String>,
    pub status: Option<JobStatus>,
    pub priority: Option<Priority>,
    pub branch: Option<String>,
    pub due_date: Option<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub total_amount: Option<f64>,
    pub invoice_number: Option<String>,
    pub details: Option<String>,
    pub details_plain: Option<String>,
    pub approval_status: Option<ApprovalStatus>,
    pub approved_by: Option<String>,
    pub approved_at: Option<Watermark>,
    pub created_at: Option<Watermark>,
    pub updated_at: Option<Watermark>,
}

impl RemoteJobRow {
    /// An id-plus-watermark row, as returned by a minimal fetch.
    pub fn minimal(id: impl Into<RecordId>, updated_at: Option<Watermark>) -> Self {
        Self {
            id: id.into(),
            updated_at,
            ..Self::default()
        }
    }
}

/// A denormalised job order as stored in the local cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedJobRecord {
    pub id: RecordId,
    pub jo_number: String,
    pub customer_id: Option<RecordId>,
    pub customer_name: String,
    pub salesman_id: Option<RecordId>,
    pub salesman_name: String,
    pub designer_id: Option<RecordId>,
    pub designer_name: String,
    pub job_title_id: Option<RecordId>,
    pub job_title: String,
    pub client_name: String,
    pub assignee: Option<String>,
    pub status: JobStatus,
    pub priority: Priority,
    pub branch: String,
    pub due_date: Option<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub total_amount: f64,
    pub invoice_number: Option<String>,
    pub details: String,
    #[serde(default)]
    pub details_plain: String,
    pub approval_status: ApprovalStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<Watermark>,
    pub created_at: Watermark,
    pub updated_at: Watermark,
}

/// Reduce rich-text details to plain text.
///
/// Drops tags, decodes the handful of entities editors emit and collapses
/// whitespace runs to single spaces.
pub fn strip_markup(rich: &str) -> String {
    let mut text = String::with_capacity(rich.len());
    let mut in_tag = false;
    let mut chars = rich.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            // a bare `<` in prose is kept as text
            '<' if !in_tag
                && chars
                    .peek()
                    .is_some_and(|&next| next.is_ascii_alphabetic() || next == '/' || next == '!') =>
            {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            _ => text.push(c),
        }
    }

    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
