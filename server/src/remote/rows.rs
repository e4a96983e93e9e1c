//! Row types read from the remote Postgres store.

use chrono::{DateTime, Utc};
use jobsync_engine::{
    ApprovalStatus, Customer, JobStatus, JobTitle, NotificationKind, NotificationRecord,
    Priority, RemoteJobRow, StaffMember, StaffRole, Watermark,
};
use sqlx::Row;
use std::str::FromStr;

use super::RemoteError;

/// A full job-order row.
#[derive(Debug)]
pub struct StoredJob {
    pub id: String,
    pub jo_number: Option<String>,
    pub customer_id: Option<String>,
    pub salesman_id: Option<String>,
    pub designer_id: Option<String>,
    pub job_title_id: Option<String>,
    pub client_name: Option<String>,
    pub assignee: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub branch: Option<String>,
    pub due_date: Option<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub total_amount: Option<f64>,
    pub invoice_number: Option<String>,
    pub details: Option<String>,
    pub details_plain: Option<String>,
    pub approval_status: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredJob {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredJob {
            id: row.try_get("id")?,
            jo_number: row.try_get("jo_number")?,
            customer_id: row.try_get("customer_id")?,
            salesman_id: row.try_get("salesman_id")?,
            designer_id: row.try_get("designer_id")?,
            job_title_id: row.try_get("job_title_id")?,
            client_name: row.try_get("client_name")?,
            assignee: row.try_get("assignee")?,
            status: row.try_get("status")?,
            priority: row.try_get("priority")?,
            branch: row.try_get("branch")?,
            due_date: row.try_get("due_date")?,
            estimated_hours: row.try_get("estimated_hours")?,
            actual_hours: row.try_get("actual_hours")?,
            total_amount: row.try_get("total_amount")?,
            invoice_number: row.try_get("invoice_number")?,
            details: row.try_get("details")?,
            details_plain: row.try_get("details_plain")?,
            approval_status: row.try_get("approval_status")?,
            approved_by: row.try_get("approved_by")?,
            approved_at: row.try_get("approved_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl StoredJob {
    /// Convert to the engine's raw row. Unknown enum strings fall back to
    /// the engine defaults with a warning instead of failing the batch.
    pub fn into_remote_row(self) -> RemoteJobRow {
        let status = lenient::<JobStatus>(&self.id, "status", self.status.as_deref());
        let priority = lenient::<Priority>(&self.id, "priority", self.priority.as_deref());
        let approval_status = lenient::<ApprovalStatus>(
            &self.id,
            "approval_status",
            self.approval_status.as_deref(),
        );

        RemoteJobRow {
            id: self.id,
            jo_number: self.jo_number,
            customer_id: self.customer_id,
            salesman_id: self.salesman_id,
            designer_id: self.designer_id,
            job_title_id: self.job_title_id,
            client_name: self.client_name,
            assignee: self.assignee,
            status,
            priority,
            branch: self.branch,
            due_date: self.due_date,
            estimated_hours: self.estimated_hours,
            actual_hours: self.actual_hours,
            total_amount: self.total_amount,
            invoice_number: self.invoice_number,
            details: self.details,
            details_plain: self.details_plain,
            approval_status,
            approved_by: self.approved_by,
            approved_at: self.approved_at.map(Watermark::from_datetime),
            created_at: self.created_at.map(Watermark::from_datetime),
            updated_at: self.updated_at.map(Watermark::from_datetime),
        }
    }
}

fn lenient<T: FromStr>(id: &str, field: &str, raw: Option<&str>) -> Option<T> {
    let raw = raw?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(job_id = %id, field, value = raw, "unrecognised value, using default");
            None
        }
    }
}

/// The minimal projection used by the repair pass.
#[derive(Debug)]
pub struct StoredJobVersion {
    pub id: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredJobVersion {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredJobVersion {
            id: row.try_get("id")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl StoredJobVersion {
    pub fn into_remote_row(self) -> RemoteJobRow {
        RemoteJobRow::minimal(self.id, self.updated_at.map(Watermark::from_datetime))
    }
}

#[derive(Debug)]
pub struct StoredCustomer {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredCustomer {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredCustomer {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
        })
    }
}

impl From<StoredCustomer> for Customer {
    fn from(row: StoredCustomer) -> Self {
        Customer {
            id: row.id,
            name: row.name.unwrap_or_default(),
            email: row.email,
            phone: row.phone,
            address: row.address,
        }
    }
}

#[derive(Debug)]
pub struct StoredStaff {
    pub id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredStaff {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredStaff {
            id: row.try_get("id")?,
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            role: row.try_get("role")?,
        })
    }
}

impl TryFrom<StoredStaff> for StaffMember {
    type Error = RemoteError;

    fn try_from(row: StoredStaff) -> Result<Self, Self::Error> {
        let role = StaffRole::parse(&row.role).ok_or_else(|| {
            RemoteError::InvalidRow(format!("user {} has unknown role {:?}", row.id, row.role))
        })?;
        Ok(StaffMember {
            id: row.id,
            name: row.full_name.unwrap_or_default(),
            email: row.email,
            role,
        })
    }
}

#[derive(Debug)]
pub struct StoredJobTitle {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredJobTitle {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredJobTitle {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
        })
    }
}

impl From<StoredJobTitle> for JobTitle {
    fn from(row: StoredJobTitle) -> Self {
        JobTitle {
            id: row.id,
            title: row.title.unwrap_or_default(),
            description: row.description,
        }
    }
}

#[derive(Debug)]
pub struct StoredNotification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub message: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub read: bool,
    pub snoozed_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredNotification {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredNotification {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            kind: row.try_get("type")?,
            message: row.try_get("message")?,
            payload: row.try_get("payload")?,
            read: row.try_get("read")?,
            snoozed_until: row.try_get("snoozed_until")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<StoredNotification> for NotificationRecord {
    fn from(row: StoredNotification) -> Self {
        NotificationRecord {
            id: row.id,
            user_id: row.user_id,
            kind: NotificationKind::parse_lenient(&row.kind),
            message: row.message.unwrap_or_default(),
            payload: row.payload.unwrap_or(serde_json::Value::Null),
            read: row.read,
            snoozed_until: row.snoozed_until.map(Watermark::from_datetime),
            created_at: Watermark::from_datetime(row.created_at),
        }
    }
}
