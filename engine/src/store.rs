//! Store - the in-memory table set.
//!
//! The Store holds every cached table. Each mutation bumps a per-table
//! revision counter when it actually changes content, which is what live
//! queries watch to know when to recompute.

use crate::enrich::Enricher;
use crate::query::JobQuery;
use crate::reference::index_by_key;
use crate::{
    error::Result, CachedJobRecord, Error, NotificationPatch, NotificationRecord, PassKind,
    RecordId, ReferenceData, ReferenceTables, SyncMetadata, Watermark,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// The persisted tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Table {
    Jobs,
    Customers,
    Salesmen,
    Designers,
    JobTitles,
    SyncMeta,
    Notifications,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Jobs,
        Table::Customers,
        Table::Salesmen,
        Table::Designers,
        Table::JobTitles,
        Table::SyncMeta,
        Table::Notifications,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Jobs => "jobs",
            Table::Customers => "customers",
            Table::Salesmen => "salesmen",
            Table::Designers => "designers",
            Table::JobTitles => "jobTitles",
            Table::SyncMeta => "syncMeta",
            Table::Notifications => "notifications",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-table change counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Revisions([u64; 7]);

impl Revisions {
    pub fn get(&self, table: Table) -> u64 {
        self.0[table.index()]
    }

    fn bump(&mut self, table: Table) {
        self.0[table.index()] += 1;
    }
}

/// The main store holding all cached state.
#[derive(Debug, Clone, Default)]
pub struct Store {
    jobs: HashMap<RecordId, CachedJobRecord>,
    references: ReferenceTables,
    sync_meta: SyncMetadata,
    notifications: HashMap<RecordId, NotificationRecord>,
    revisions: Revisions,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current change counters.
    pub fn revisions(&self) -> Revisions {
        self.revisions
    }

    // --- jobs ---

    /// True when the job table is empty and a bootstrap is required.
    pub fn needs_bootstrap(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn job(&self, id: &str) -> Option<&CachedJobRecord> {
        self.jobs.get(id)
    }

    /// All cached jobs in no particular order.
    pub fn jobs(&self) -> impl Iterator<Item = &CachedJobRecord> {
        self.jobs.values()
    }

    /// All cached jobs, newest creation first (ties by id for stability).
    pub fn jobs_newest_first(&self) -> Vec<&CachedJobRecord> {
        let mut jobs: Vec<_> = self.jobs.values().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    /// Start a filtered, paginated query over the cached jobs.
    pub fn query_jobs(&self) -> JobQuery<'_> {
        JobQuery::new(self)
    }

    /// Identifiers of every cached job.
    pub fn job_ids(&self) -> HashSet<RecordId> {
        self.jobs.keys().cloned().collect()
    }

    /// Cached modification watermark per job.
    pub fn job_versions(&self) -> HashMap<RecordId, Watermark> {
        self.jobs
            .iter()
            .map(|(id, job)| (id.clone(), job.updated_at.clone()))
            .collect()
    }

    /// Insert or replace job records. Returns how many records changed.
    ///
    /// This is the only write path for jobs; single-record refreshes go
    /// through it too.
    pub fn upsert_jobs(&mut self, records: impl IntoIterator<Item = CachedJobRecord>) -> usize {
        let mut changed = 0;
        for record in records {
            if self.jobs.get(&record.id) == Some(&record) {
                continue;
            }
            self.jobs.insert(record.id.clone(), record);
            changed += 1;
        }
        if changed > 0 {
            self.revisions.bump(Table::Jobs);
        }
        changed
    }

    /// Upsert one job record. Returns true if it changed.
    pub fn upsert_job(&mut self, record: CachedJobRecord) -> bool {
        self.upsert_jobs(std::iter::once(record)) > 0
    }

    /// Remove jobs by id. Returns how many were present.
    pub fn remove_jobs<'a>(&mut self, ids: impl IntoIterator<Item = &'a RecordId>) -> usize {
        let removed = ids
            .into_iter()
            .filter(|id| self.jobs.remove(id.as_str()).is_some())
            .count();
        if removed > 0 {
            self.revisions.bump(Table::Jobs);
        }
        removed
    }

    /// Re-resolve display names of cached jobs against the current
    /// reference tables. Returns how many records changed.
    pub fn relabel_jobs(&mut self) -> usize {
        let enricher = Enricher::new(&self.references);
        let relabeled: Vec<CachedJobRecord> =
            self.jobs.values().filter_map(|job| enricher.relabel(job)).collect();
        self.upsert_jobs(relabeled)
    }

    // --- reference tables ---

    pub fn references(&self) -> &ReferenceTables {
        &self.references
    }

    /// Replace all four reference tables wholesale.
    pub fn replace_references(&mut self, data: ReferenceData) {
        let customers = index_by_key(data.customers);
        if customers != self.references.customers {
            self.references.customers = customers;
            self.revisions.bump(Table::Customers);
        }

        let salesmen = index_by_key(data.salesmen);
        if salesmen != self.references.salesmen {
            self.references.salesmen = salesmen;
            self.revisions.bump(Table::Salesmen);
        }

        let designers = index_by_key(data.designers);
        if designers != self.references.designers {
            self.references.designers = designers;
            self.revisions.bump(Table::Designers);
        }

        let job_titles = index_by_key(data.job_titles);
        if job_titles != self.references.job_titles {
            self.references.job_titles = job_titles;
            self.revisions.bump(Table::JobTitles);
        }
    }

    // --- sync metadata ---

    pub fn sync_meta(&self) -> &SyncMetadata {
        &self.sync_meta
    }

    pub fn last_sync_time(&self) -> Option<&Watermark> {
        self.sync_meta.last_sync_time.as_ref()
    }

    /// Claim the pass guard. Fails if any pass is already running.
    pub fn begin_pass(&mut self, kind: PassKind) -> Result<()> {
        self.sync_meta.begin(kind)?;
        self.revisions.bump(Table::SyncMeta);
        Ok(())
    }

    /// Release the pass guard after success.
    pub fn complete_pass(
        &mut self,
        kind: PassKind,
        watermark: Option<Watermark>,
        finished_at: Watermark,
        changed: usize,
    ) {
        self.sync_meta.complete(kind, watermark, finished_at, changed);
        self.revisions.bump(Table::SyncMeta);
    }

    /// Release the pass guard after failure.
    pub fn fail_pass(&mut self, message: impl Into<String>) {
        self.sync_meta.fail(message);
        self.revisions.bump(Table::SyncMeta);
    }

    // --- notifications ---

    pub fn notification(&self, id: &str) -> Option<&NotificationRecord> {
        self.notifications.get(id)
    }

    pub fn notifications(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.notifications.values()
    }

    /// Notifications addressed to one user.
    pub fn notifications_for<'a>(
        &'a self,
        user_id: &'a str,
    ) -> impl Iterator<Item = &'a NotificationRecord> + 'a {
        self.notifications
            .values()
            .filter(move |n| n.user_id == user_id)
    }

    /// Insert or replace notifications. Returns how many changed.
    pub fn upsert_notifications(
        &mut self,
        records: impl IntoIterator<Item = NotificationRecord>,
    ) -> usize {
        let mut changed = 0;
        for record in records {
            if self.notifications.get(&record.id) == Some(&record) {
                continue;
            }
            self.notifications.insert(record.id.clone(), record);
            changed += 1;
        }
        if changed > 0 {
            self.revisions.bump(Table::Notifications);
        }
        changed
    }

    /// Apply a partial update to one notification.
    pub fn update_notification(
        &mut self,
        id: &str,
        patch: &NotificationPatch,
    ) -> Result<&NotificationRecord> {
        let record = self
            .notifications
            .get_mut(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        record.apply(patch);
        self.revisions.bump(Table::Notifications);
        Ok(record)
    }

    // --- whole store ---

    /// Drop every cached table and the watermark.
    ///
    /// A pass guard held by the caller survives, so a full resync can clear
    /// the cache from inside its own pass.
    pub fn clear_all(&mut self) {
        let in_progress = self.sync_meta.in_progress;
        let current_pass = self.sync_meta.current_pass;

        self.jobs.clear();
        self.references = ReferenceTables::default();
        self.notifications.clear();
        self.sync_meta = SyncMetadata {
            in_progress,
            current_pass,
            ..SyncMetadata::default()
        };

        for table in Table::ALL {
            self.revisions.bump(table);
        }
    }

    /// Export the current store state as a snapshot.
    pub fn export_state(&self) -> crate::snapshot::StoreSnapshot {
        let mut snapshot = crate::snapshot::StoreSnapshot::new();
        snapshot.jobs = self
            .jobs
            .iter()
            .map(|(id, r)| (id.clone(), r.clone()))
            .collect();
        snapshot.customers = self
            .references
            .customers
            .iter()
            .map(|(id, r)| (id.clone(), r.clone()))
            .collect();
        snapshot.salesmen = self
            .references
            .salesmen
            .iter()
            .map(|(id, r)| (id.clone(), r.clone()))
            .collect();
        snapshot.designers = self
            .references
            .designers
            .iter()
            .map(|(id, r)| (id.clone(), r.clone()))
            .collect();
        snapshot.job_titles = self
            .references
            .job_titles
            .iter()
            .map(|(id, r)| (id.clone(), r.clone()))
            .collect();
        snapshot.sync_meta = self.sync_meta.clone();
        snapshot.notifications = self
            .notifications
            .iter()
            .map(|(id, r)| (id.clone(), r.clone()))
            .collect();
        snapshot
    }

    /// Build a store from a snapshot.
    ///
    /// An in-progress flag in the snapshot belongs to a process that is no
    /// longer running, so it is cleared.
    pub fn from_snapshot(snapshot: crate::snapshot::StoreSnapshot) -> Self {
        let mut sync_meta = snapshot.sync_meta;
        sync_meta.clear_stale_flag();

        Self {
            jobs: snapshot.jobs.into_iter().collect(),
            references: ReferenceTables {
                customers: snapshot.customers.into_iter().collect(),
                salesmen: snapshot.salesmen.into_iter().collect(),
                designers: snapshot.designers.into_iter().collect(),
                job_titles: snapshot.job_titles.into_iter().collect(),
            },
            sync_meta,
            notifications: snapshot.notifications.into_iter().collect(),
            revisions: Revisions::default(),
        }
    }
}
