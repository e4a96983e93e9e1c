//! The remote store: the only source of truth the cache mirrors.
//!
//! Sync passes talk to it through the [`RemoteSource`] trait so they can run
//! against Postgres in production and an in-memory fake in tests.

mod postgres;
mod rows;

pub use postgres::{PgRemote, NOTIFICATION_CHANNEL};

use async_trait::async_trait;
use jobsync_engine::{
    Customer, JobTitle, NotificationPatch, NotificationRecord, RecordId, RemoteJobRow,
    StaffMember, StaffRole, Watermark,
};
use tokio::sync::mpsc;

/// Remote failures.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("remote unavailable: {0}")]
    Unavailable(String),

    #[error("invalid row: {0}")]
    InvalidRow(String),
}

pub type Result<T> = std::result::Result<T, RemoteError>;

/// Which job rows to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSelector {
    All,
    /// Modification timestamp strictly greater than the watermark
    ModifiedAfter(Watermark),
    Ids(Vec<RecordId>),
}

/// Sort order of a job fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOrder {
    CreatedDesc,
    UpdatedDesc,
}

/// Which columns a job fetch returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchShape {
    /// Identifier and modification timestamp only
    Minimal,
    Full,
}

/// A ranged, filtered, ordered read of job rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFetch {
    pub selector: JobSelector,
    pub order: JobOrder,
    /// `(offset, limit)`
    pub range: Option<(usize, usize)>,
    pub shape: FetchShape,
}

impl JobFetch {
    /// One bootstrap batch, newest creation first.
    pub fn batch(offset: usize, limit: usize) -> Self {
        Self {
            selector: JobSelector::All,
            order: JobOrder::CreatedDesc,
            range: Some((offset, limit)),
            shape: FetchShape::Full,
        }
    }

    /// Every row changed after the watermark, newest change first.
    pub fn modified_after(watermark: Watermark) -> Self {
        Self {
            selector: JobSelector::ModifiedAfter(watermark),
            order: JobOrder::UpdatedDesc,
            range: None,
            shape: FetchShape::Full,
        }
    }

    /// The id + watermark projection of every row.
    pub fn all_versions() -> Self {
        Self {
            selector: JobSelector::All,
            order: JobOrder::UpdatedDesc,
            range: None,
            shape: FetchShape::Minimal,
        }
    }

    /// Full rows for a set of ids.
    pub fn by_ids(ids: Vec<RecordId>) -> Self {
        Self {
            selector: JobSelector::Ids(ids),
            order: JobOrder::UpdatedDesc,
            range: None,
            shape: FetchShape::Full,
        }
    }
}

/// Stream of newly inserted notifications for one user.
///
/// The producer stops once this receiver is dropped.
pub type NotificationFeed = mpsc::Receiver<NotificationRecord>;

/// Everything the sync engine reads from (or writes to) the remote store.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// The remote clock, used as the next delta watermark.
    async fn current_watermark(&self) -> Result<Watermark>;

    async fn count_jobs(&self) -> Result<usize>;

    async fn fetch_jobs(&self, fetch: &JobFetch) -> Result<Vec<RemoteJobRow>>;

    /// One full row, `None` if it no longer exists.
    async fn fetch_job(&self, id: &str) -> Result<Option<RemoteJobRow>>;

    async fn fetch_customers(&self) -> Result<Vec<Customer>>;

    /// Staff whose role is one of `roles`.
    async fn fetch_staff(&self, roles: &[StaffRole]) -> Result<Vec<StaffMember>>;

    async fn fetch_job_titles(&self) -> Result<Vec<JobTitle>>;

    /// Every unread notification of a user plus the `limit` most recent
    /// ones, newest first.
    async fn fetch_notifications(&self, user_id: &str, limit: usize)
        -> Result<Vec<NotificationRecord>>;

    async fn update_notification(&self, id: &str, patch: &NotificationPatch) -> Result<()>;

    async fn subscribe_notifications(&self, user_id: &str) -> Result<NotificationFeed>;
}
