//! Postgres implementation of [`RemoteSource`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobsync_engine::{
    Customer, JobTitle, NotificationPatch, NotificationRecord, RemoteJobRow, StaffMember,
    StaffRole, Watermark,
};
use sqlx::postgres::{PgListener, PgPoolOptions};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tokio::sync::mpsc;

use super::rows::{
    StoredCustomer, StoredJob, StoredJobTitle, StoredJobVersion, StoredNotification, StoredStaff,
};
use super::{
    FetchShape, JobFetch, JobOrder, JobSelector, NotificationFeed, RemoteSource, Result,
};

/// Channel the remote fires on every notification insert; the payload is
/// the new notification's id.
pub const NOTIFICATION_CHANNEL: &str = "notification_inserted";

const LISTENER_RETRY_INTERVAL: Duration = Duration::from_secs(5);
const FEED_CAPACITY: usize = 64;

const FULL_JOB_COLUMNS: &str = "id::text AS id, jo_number, \
    customer_id::text AS customer_id, salesman_id::text AS salesman_id, \
    designer_id::text AS designer_id, job_title_id::text AS job_title_id, \
    client_name, assignee, status, priority, branch, due_date::text AS due_date, \
    estimated_hours::float8 AS estimated_hours, actual_hours::float8 AS actual_hours, \
    total_amount::float8 AS total_amount, invoice_number, details, details_plain, \
    approval_status, approved_by::text AS approved_by, approved_at, created_at, updated_at";

const MINIMAL_JOB_COLUMNS: &str = "id::text AS id, updated_at";

const NOTIFICATION_COLUMNS: &str = "id::text AS id, user_id::text AS user_id, type, message, \
    payload, read, snoozed_until, created_at";

/// The remote relational store, reached through a connection pool.
#[derive(Debug, Clone)]
pub struct PgRemote {
    pool: PgPool,
}

impl PgRemote {
    /// Connect a pool to the remote database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }
}

fn build_job_query(fetch: &JobFetch) -> QueryBuilder<'_, Postgres> {
    let columns = match fetch.shape {
        FetchShape::Minimal => MINIMAL_JOB_COLUMNS,
        FetchShape::Full => FULL_JOB_COLUMNS,
    };

    let mut query = QueryBuilder::new("SELECT ");
    query.push(columns).push(" FROM job_orders");

    match &fetch.selector {
        JobSelector::All => {}
        JobSelector::ModifiedAfter(watermark) => {
            query
                .push(" WHERE updated_at > ")
                .push_bind(watermark.as_str())
                .push("::timestamptz");
        }
        JobSelector::Ids(ids) => {
            query.push(" WHERE id::text = ANY(").push_bind(ids).push(")");
        }
    }

    query.push(match fetch.order {
        JobOrder::CreatedDesc => " ORDER BY created_at DESC, id",
        JobOrder::UpdatedDesc => " ORDER BY updated_at DESC, id",
    });

    if let Some((offset, limit)) = fetch.range {
        query
            .push(" OFFSET ")
            .push_bind(offset as i64)
            .push(" LIMIT ")
            .push_bind(limit as i64);
    }

    query
}

#[async_trait]
impl RemoteSource for PgRemote {
    async fn current_watermark(&self) -> Result<Watermark> {
        let now: DateTime<Utc> = sqlx::query_scalar("SELECT clock_timestamp()")
            .fetch_one(&self.pool)
            .await?;
        Ok(Watermark::from_datetime(now))
    }

    async fn count_jobs(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }

    async fn fetch_jobs(&self, fetch: &JobFetch) -> Result<Vec<RemoteJobRow>> {
        if matches!(&fetch.selector, JobSelector::Ids(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut query = build_job_query(fetch);
        let rows = match fetch.shape {
            FetchShape::Minimal => query
                .build_query_as::<StoredJobVersion>()
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(StoredJobVersion::into_remote_row)
                .collect(),
            FetchShape::Full => query
                .build_query_as::<StoredJob>()
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(StoredJob::into_remote_row)
                .collect(),
        };

        Ok(rows)
    }

    async fn fetch_job(&self, id: &str) -> Result<Option<RemoteJobRow>> {
        let sql = format!(
            "SELECT {} FROM job_orders WHERE id::text = $1",
            FULL_JOB_COLUMNS
        );
        let row: Option<StoredJob> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(StoredJob::into_remote_row))
    }

    async fn fetch_customers(&self) -> Result<Vec<Customer>> {
        let rows: Vec<StoredCustomer> = sqlx::query_as(
            r#"
            SELECT id::text AS id, name, email, phone, address
            FROM customers
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Customer::from).collect())
    }

    async fn fetch_staff(&self, roles: &[StaffRole]) -> Result<Vec<StaffMember>> {
        let roles: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
        let rows: Vec<StoredStaff> = sqlx::query_as(
            r#"
            SELECT id::text AS id, full_name, email, role
            FROM users
            WHERE lower(role) = ANY($1)
            ORDER BY full_name
            "#,
        )
        .bind(&roles)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StaffMember::try_from).collect()
    }

    async fn fetch_job_titles(&self) -> Result<Vec<JobTitle>> {
        let rows: Vec<StoredJobTitle> = sqlx::query_as(
            r#"
            SELECT id::text AS id, title, description
            FROM job_titles
            ORDER BY title
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(JobTitle::from).collect())
    }

    async fn fetch_notifications(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE user_id::text = $1 \
             AND (read = false OR id IN (\
                 SELECT id FROM notifications WHERE user_id::text = $1 \
                 ORDER BY created_at DESC LIMIT $2)) \
             ORDER BY created_at DESC",
            NOTIFICATION_COLUMNS
        );
        let rows: Vec<StoredNotification> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(NotificationRecord::from).collect())
    }

    async fn update_notification(&self, id: &str, patch: &NotificationPatch) -> Result<()> {
        if patch.read.is_none() && patch.snoozed_until.is_none() {
            return Ok(());
        }

        let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new("UPDATE notifications SET ");
        {
            let mut set = query.separated(", ");
            if let Some(read) = patch.read {
                set.push("read = ").push_bind_unseparated(read);
            }
            if let Some(until) = &patch.snoozed_until {
                set.push("snoozed_until = ")
                    .push_bind_unseparated(until.as_ref().map(|w| w.as_str().to_string()))
                    .push_unseparated("::timestamptz");
            }
        }
        query.push(" WHERE id::text = ").push_bind(id);

        let result = query.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            tracing::warn!(notification_id = %id, "notification update matched no rows");
        }
        Ok(())
    }

    async fn subscribe_notifications(&self, user_id: &str) -> Result<NotificationFeed> {
        let listener = connect_listener(&self.pool).await?;
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);

        tokio::spawn(forward_notifications(
            self.pool.clone(),
            listener,
            user_id.to_string(),
            tx,
        ));

        Ok(rx)
    }
}

async fn connect_listener(pool: &PgPool) -> std::result::Result<PgListener, sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(NOTIFICATION_CHANNEL).await?;
    tracing::info!(channel = NOTIFICATION_CHANNEL, "notification listener subscribed");
    Ok(listener)
}

async fn fetch_user_notification(
    pool: &PgPool,
    id: &str,
    user_id: &str,
) -> Result<Option<NotificationRecord>> {
    let sql = format!(
        "SELECT {} FROM notifications WHERE id::text = $1 AND user_id::text = $2",
        NOTIFICATION_COLUMNS
    );
    let row: Option<StoredNotification> = sqlx::query_as(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(NotificationRecord::from))
}

/// Relay inserts for one user until the feed receiver goes away,
/// reconnecting the listener whenever it drops.
async fn forward_notifications(
    pool: PgPool,
    listener: PgListener,
    user_id: String,
    tx: mpsc::Sender<NotificationRecord>,
) {
    let mut listener = Some(listener);

    loop {
        if let Some(active) = listener.as_mut() {
            let mut listener_failed = false;
            tokio::select! {
                _ = tx.closed() => break,
                notification = active.recv() => match notification {
                    Ok(notification) => {
                        let id = notification.payload().trim();
                        match fetch_user_notification(&pool, id, &user_id).await {
                            Ok(Some(record)) => {
                                if tx.send(record).await.is_err() {
                                    break;
                                }
                            }
                            // inserted for another user
                            Ok(None) => {}
                            Err(err) => {
                                tracing::warn!(error = %err, notification_id = %id, "failed to fetch pushed notification");
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            channel = NOTIFICATION_CHANNEL,
                            "notification listener disconnected; will reconnect"
                        );
                        listener_failed = true;
                    }
                }
            }

            if listener_failed {
                listener = None;
            }
        } else {
            tokio::select! {
                _ = tx.closed() => break,
                _ = tokio::time::sleep(LISTENER_RETRY_INTERVAL) => {
                    match connect_listener(&pool).await {
                        Ok(reconnected) => listener = Some(reconnected),
                        Err(err) => tracing::warn!(error = %err, "notification listener reconnect failed"),
                    }
                }
            }
        }
    }

    tracing::debug!(user_id = %user_id, "notification feed closed");
}
