//! Snapshot types for persisting and restoring store state.
//!
//! Snapshots are the bridge between the in-memory Store and persistent
//! storage. Tables are kept in BTreeMaps so serialization is deterministic.

use crate::schema::{self, CURRENT_SCHEMA_VERSION};
use crate::{
    error::Result, CachedJobRecord, Customer, Error, JobTitle, NotificationRecord, RecordId,
    SchemaVersion, StaffMember, SyncMetadata, Watermark,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the snapshot envelope format.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time snapshot of every cached table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Snapshot envelope version
    pub format_version: u32,
    /// Table-layout version, migrated forward on load
    pub schema_version: SchemaVersion,
    #[serde(default)]
    pub jobs: BTreeMap<RecordId, CachedJobRecord>,
    #[serde(default)]
    pub customers: BTreeMap<RecordId, Customer>,
    #[serde(default)]
    pub salesmen: BTreeMap<RecordId, StaffMember>,
    #[serde(default)]
    pub designers: BTreeMap<RecordId, StaffMember>,
    #[serde(default)]
    pub job_titles: BTreeMap<RecordId, JobTitle>,
    #[serde(default)]
    pub sync_meta: SyncMetadata,
    #[serde(default)]
    pub notifications: BTreeMap<RecordId, NotificationRecord>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreSnapshot {
    /// Create a new empty snapshot at the current versions.
    pub fn new() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            schema_version: CURRENT_SCHEMA_VERSION,
            jobs: BTreeMap::new(),
            customers: BTreeMap::new(),
            salesmen: BTreeMap::new(),
            designers: BTreeMap::new(),
            job_titles: BTreeMap::new(),
            sync_meta: SyncMetadata::default(),
            notifications: BTreeMap::new(),
        }
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON, migrating older schema versions forward.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut doc: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        let format_version = doc
            .get("formatVersion")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(u64::from(SNAPSHOT_FORMAT_VERSION));
        if format_version > u64::from(SNAPSHOT_FORMAT_VERSION) {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        if let Some(obj) = doc.as_object_mut() {
            obj.entry("formatVersion")
                .or_insert(serde_json::Value::from(SNAPSHOT_FORMAT_VERSION));
        }

        schema::migrate(&mut doc)?;

        serde_json::from_value(doc).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Summary of the snapshot contents.
    pub fn metadata(&self) -> SnapshotMetadata {
        SnapshotMetadata {
            format_version: self.format_version,
            schema_version: self.schema_version,
            job_count: self.jobs.len(),
            notification_count: self.notifications.len(),
            last_sync_time: self.sync_meta.last_sync_time.clone(),
        }
    }
}

/// Metadata about a snapshot (without the full data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub format_version: u32,
    pub schema_version: SchemaVersion,
    pub job_count: usize,
    pub notification_count: usize,
    pub last_sync_time: Option<Watermark>,
}
