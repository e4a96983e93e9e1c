//! In-memory remote store for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jobsync_engine::{
    Customer, JobTitle, NotificationKind, NotificationPatch, NotificationRecord, RecordId,
    RemoteJobRow, StaffMember, StaffRole, Watermark,
};
use jobsync_server::config::SyncConfig;
use jobsync_server::local::LocalStore;
use jobsync_server::remote::{
    FetchShape, JobFetch, JobOrder, JobSelector, NotificationFeed, RemoteError, RemoteSource,
};
use jobsync_server::sync::SyncEngine;
use tokio::sync::{mpsc, Notify};

pub const USER: &str = "user-1";

struct State {
    clock: DateTime<Utc>,
    jobs: BTreeMap<RecordId, RemoteJobRow>,
    customers: Vec<Customer>,
    staff: Vec<StaffMember>,
    job_titles: Vec<JobTitle>,
    notifications: BTreeMap<RecordId, NotificationRecord>,
    feeds: Vec<(String, mpsc::Sender<NotificationRecord>)>,
}

/// A remote store whose clock advances one second per mutation.
pub struct FakeRemote {
    state: Mutex<State>,
    paused: AtomicBool,
    /// Signalled when a paused job fetch is waiting
    pub entered: Notify,
    release: Notify,
    fail_next_fetch: AtomicBool,
    fail_updates: AtomicBool,
    pub job_fetches: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        let clock = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        Arc::new(Self {
            state: Mutex::new(State {
                clock,
                jobs: BTreeMap::new(),
                customers: vec![customer("c1", "ACME Signs")],
                staff: vec![
                    staff("s1", "Sam Sales", StaffRole::Salesman),
                    staff("d1", "Dana Design", StaffRole::Designer),
                ],
                job_titles: vec![JobTitle {
                    id: "t1".into(),
                    title: "Tarpaulin Printing".into(),
                    description: None,
                }],
                notifications: BTreeMap::new(),
                feeds: Vec::new(),
            }),
            paused: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
            fail_next_fetch: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
            job_fetches: AtomicUsize::new(0),
        })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn tick(state: &mut State) -> Watermark {
        state.clock += Duration::seconds(1);
        Watermark::from_datetime(state.clock)
    }

    pub fn add_job(&self, id: &str) {
        let mut state = self.state();
        let at = Self::tick(&mut state);
        let row = job_row(id, at);
        state.jobs.insert(id.to_string(), row);
    }

    pub fn add_jobs(&self, count: usize) {
        for n in 0..count {
            self.add_job(&format!("job-{:05}", n));
        }
    }

    pub fn add_job_row(&self, mut row: RemoteJobRow) {
        let mut state = self.state();
        let at = Self::tick(&mut state);
        row.created_at.get_or_insert_with(|| at.clone());
        row.updated_at = Some(at);
        state.jobs.insert(row.id.clone(), row);
    }

    /// Change a job's details and bump its modification time.
    pub fn touch_job(&self, id: &str, details: &str) {
        let mut state = self.state();
        let at = Self::tick(&mut state);
        if let Some(row) = state.jobs.get_mut(id) {
            row.details = Some(details.to_string());
            row.updated_at = Some(at);
        }
    }

    pub fn delete_job(&self, id: &str) {
        self.state().jobs.remove(id);
    }

    pub fn job_ids(&self) -> Vec<RecordId> {
        self.state().jobs.keys().cloned().collect()
    }

    pub fn add_customer(&self, id: &str, name: &str) {
        self.state().customers.push(customer(id, name));
    }

    pub fn now(&self) -> Watermark {
        Watermark::from_datetime(self.state().clock)
    }

    /// Make job fetches wait until [`resume`](Self::resume).
    pub fn pause_fetches(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }

    pub fn fail_next_fetch(&self) {
        self.fail_next_fetch.store(true, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Store a notification and announce it to matching subscribers.
    pub async fn push_notification(&self, record: NotificationRecord) {
        let senders: Vec<_> = {
            let mut state = self.state();
            state.notifications.insert(record.id.clone(), record.clone());
            state
                .feeds
                .iter()
                .filter(|(user, _)| *user == record.user_id)
                .map(|(_, tx)| tx.clone())
                .collect()
        };
        for tx in senders {
            let _ = tx.send(record.clone()).await;
        }
    }

    pub fn insert_notification(&self, record: NotificationRecord) {
        self.state().notifications.insert(record.id.clone(), record);
    }

    pub fn notification(&self, id: &str) -> Option<NotificationRecord> {
        self.state().notifications.get(id).cloned()
    }

    fn select(&self, fetch: &JobFetch) -> Vec<RemoteJobRow> {
        let state = self.state();
        let mut rows: Vec<RemoteJobRow> = state
            .jobs
            .values()
            .filter(|row| match &fetch.selector {
                JobSelector::All => true,
                JobSelector::ModifiedAfter(since) => {
                    row.updated_at.as_ref().is_some_and(|at| at > since)
                }
                JobSelector::Ids(ids) => ids.contains(&row.id),
            })
            .cloned()
            .collect();

        match fetch.order {
            JobOrder::CreatedDesc => rows.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
            }),
            JobOrder::UpdatedDesc => rows.sort_by(|a, b| {
                b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id))
            }),
        }

        if let Some((offset, limit)) = fetch.range {
            rows = rows.into_iter().skip(offset).take(limit).collect();
        }
        if fetch.shape == FetchShape::Minimal {
            rows = rows
                .into_iter()
                .map(|row| RemoteJobRow::minimal(row.id, row.updated_at))
                .collect();
        }
        rows
    }
}

#[async_trait]
impl RemoteSource for FakeRemote {
    async fn current_watermark(&self) -> Result<Watermark, RemoteError> {
        Ok(self.now())
    }

    async fn count_jobs(&self) -> Result<usize, RemoteError> {
        Ok(self.state().jobs.len())
    }

    async fn fetch_jobs(&self, fetch: &JobFetch) -> Result<Vec<RemoteJobRow>, RemoteError> {
        self.job_fetches.fetch_add(1, Ordering::SeqCst);
        if self.paused.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        if self.fail_next_fetch.swap(false, Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("connection reset".into()));
        }
        Ok(self.select(fetch))
    }

    async fn fetch_job(&self, id: &str) -> Result<Option<RemoteJobRow>, RemoteError> {
        Ok(self.state().jobs.get(id).cloned())
    }

    async fn fetch_customers(&self) -> Result<Vec<Customer>, RemoteError> {
        Ok(self.state().customers.clone())
    }

    async fn fetch_staff(&self, roles: &[StaffRole]) -> Result<Vec<StaffMember>, RemoteError> {
        Ok(self
            .state()
            .staff
            .iter()
            .filter(|s| roles.contains(&s.role))
            .cloned()
            .collect())
    }

    async fn fetch_job_titles(&self) -> Result<Vec<JobTitle>, RemoteError> {
        Ok(self.state().job_titles.clone())
    }

    async fn fetch_notifications(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, RemoteError> {
        let mut records: Vec<NotificationRecord> = self
            .state()
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let recent: Vec<RecordId> = records.iter().take(limit).map(|n| n.id.clone()).collect();
        records.retain(|n| !n.read || recent.contains(&n.id));
        Ok(records)
    }

    async fn update_notification(
        &self,
        id: &str,
        patch: &NotificationPatch,
    ) -> Result<(), RemoteError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("write rejected".into()));
        }
        let mut state = self.state();
        let record = state
            .notifications
            .get_mut(id)
            .ok_or_else(|| RemoteError::InvalidRow(format!("no notification {}", id)))?;
        record.apply(patch);
        Ok(())
    }

    async fn subscribe_notifications(&self, user_id: &str) -> Result<NotificationFeed, RemoteError> {
        let (tx, rx) = mpsc::channel(16);
        self.state().feeds.push((user_id.to_string(), tx));
        Ok(rx)
    }
}

pub fn customer(id: &str, name: &str) -> Customer {
    Customer {
        id: id.into(),
        name: name.into(),
        email: None,
        phone: None,
        address: None,
    }
}

pub fn staff(id: &str, name: &str, role: StaffRole) -> StaffMember {
    StaffMember {
        id: id.into(),
        name: name.into(),
        email: None,
        role,
    }
}

/// A job referencing the seeded customer, salesman, designer and title.
pub fn job_row(id: &str, at: Watermark) -> RemoteJobRow {
    RemoteJobRow {
        jo_number: Some(format!("JO-{}", id)),
        customer_id: Some("c1".into()),
        salesman_id: Some("s1".into()),
        designer_id: Some("d1".into()),
        job_title_id: Some("t1".into()),
        branch: Some("Main".into()),
        created_at: Some(at.clone()),
        ..RemoteJobRow::minimal(id, Some(at))
    }
}

pub fn notification(id: &str, kind: NotificationKind, created: &str) -> NotificationRecord {
    NotificationRecord {
        id: id.into(),
        user_id: USER.into(),
        kind,
        message: format!("notification {}", id),
        payload: serde_json::Value::Null,
        read: false,
        snoozed_until: None,
        created_at: Watermark::parse(created),
    }
}

pub fn test_config() -> SyncConfig {
    SyncConfig {
        bootstrap_batch_size: 1000,
        repair_batch_size: 50,
        ..SyncConfig::default()
    }
}

pub fn engine(remote: &Arc<FakeRemote>, config: SyncConfig) -> SyncEngine {
    SyncEngine::new(remote.clone(), LocalStore::in_memory(), config)
}
