//! Enrichment: resolving foreign keys into display names.
//!
//! A dangling reference is never an error. It resolves to a fixed sentinel
//! so the job record is still cached; the next reference refresh fixes the
//! label once the referenced entity is known locally.

use crate::record::strip_markup;
use crate::{CachedJobRecord, ReferenceTables, RemoteJobRow};

/// Customer name used when `customer_id` is absent or unknown.
pub const UNKNOWN_CUSTOMER: &str = "Unknown Customer";
/// Salesman/designer name used when the id is absent or unknown.
pub const UNASSIGNED: &str = "Unassigned";
/// Job title used when `job_title_id` is absent or unknown.
pub const NO_TITLE: &str = "No Title";

/// Every sentinel the enricher can produce.
pub const SENTINELS: [&str; 3] = [UNKNOWN_CUSTOMER, UNASSIGNED, NO_TITLE];

/// Check whether a display value is a placeholder rather than real data.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || SENTINELS.contains(&value)
}

/// Joins raw remote rows against the local reference tables.
#[derive(Debug, Clone, Copy)]
pub struct Enricher<'a> {
    refs: &'a ReferenceTables,
}

impl<'a> Enricher<'a> {
    pub fn new(refs: &'a ReferenceTables) -> Self {
        Self { refs }
    }

    /// Enrich a batch of rows. Output order follows input order.
    pub fn enrich_batch(&self, rows: Vec<RemoteJobRow>) -> Vec<CachedJobRecord> {
        rows.into_iter().map(|row| self.enrich(row)).collect()
    }

    /// Enrich a single row.
    pub fn enrich(&self, row: RemoteJobRow) -> CachedJobRecord {
        let customer_name = self.customer_name(row.customer_id.as_deref());
        let salesman_name = self.salesman_name(row.salesman_id.as_deref());
        let designer_name = self.designer_name(row.designer_id.as_deref());
        let job_title = self.job_title(row.job_title_id.as_deref());

        let details = row.details.unwrap_or_default();
        let details_plain = match row.details_plain {
            Some(plain) if !plain.trim().is_empty() => plain,
            _ => strip_markup(&details),
        };

        let updated_at = row.updated_at.or_else(|| row.created_at.clone()).unwrap_or_default();
        let created_at = row.created_at.unwrap_or_else(|| updated_at.clone());

        CachedJobRecord {
            id: row.id,
            jo_number: row.jo_number.unwrap_or_default(),
            customer_id: row.customer_id,
            customer_name,
            salesman_id: row.salesman_id,
            salesman_name,
            designer_id: row.designer_id,
            designer_name,
            job_title_id: row.job_title_id,
            job_title,
            client_name: row.client_name.unwrap_or_default(),
            assignee: row.assignee,
            status: row.status.unwrap_or_default(),
            priority: row.priority.unwrap_or_default(),
            branch: row.branch.unwrap_or_default(),
            due_date: row.due_date,
            estimated_hours: row.estimated_hours,
            actual_hours: row.actual_hours,
            total_amount: row.total_amount.unwrap_or(0.0),
            invoice_number: row.invoice_number,
            details,
            details_plain,
            approval_status: row.approval_status.unwrap_or_default(),
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            created_at,
            updated_at,
        }
    }

    /// Re-resolve the display names of an already cached record.
    ///
    /// Returns `None` when every name is already current.
    pub fn relabel(&self, job: &CachedJobRecord) -> Option<CachedJobRecord> {
        let customer_name = self.customer_name(job.customer_id.as_deref());
        let salesman_name = self.salesman_name(job.salesman_id.as_deref());
        let designer_name = self.designer_name(job.designer_id.as_deref());
        let job_title = self.job_title(job.job_title_id.as_deref());

        if customer_name == job.customer_name
            && salesman_name == job.salesman_name
            && designer_name == job.designer_name
            && job_title == job.job_title
        {
            return None;
        }

        Some(CachedJobRecord {
            customer_name,
            salesman_name,
            designer_name,
            job_title,
            ..job.clone()
        })
    }

    fn customer_name(&self, id: Option<&str>) -> String {
        id.and_then(|id| self.refs.customer(id))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| UNKNOWN_CUSTOMER.to_string())
    }

    fn salesman_name(&self, id: Option<&str>) -> String {
        id.and_then(|id| self.refs.salesman(id))
            .map(|s| s.name.clone())
            .unwrap_or_else(|| UNASSIGNED.to_string())
    }

    fn designer_name(&self, id: Option<&str>) -> String {
        id.and_then(|id| self.refs.designer(id))
            .map(|d| d.name.clone())
            .unwrap_or_else(|| UNASSIGNED.to_string())
    }

    fn job_title(&self, id: Option<&str>) -> String {
        id.and_then(|id| self.refs.job_title(id))
            .map(|t| t.title.clone())
            .unwrap_or_else(|| NO_TITLE.to_string())
    }
}
