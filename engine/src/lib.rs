//! # Jobsync Engine
//!
//! The pure-logic core of an offline-first job-order cache.
//!
//! This crate holds everything about the local replica that can be decided
//! without touching a network or a disk: the cached table set, the rules for
//! turning remote rows into display-ready records, the query evaluator the UI
//! reads through, and the diff that drives the repair pass.
//!
//! ## Design Principles
//!
//! - **No IO**: no files, no network, no clock reads. Callers pass "now".
//! - **Deterministic**: same inputs always produce the same outputs.
//! - **Disposable**: the remote store is the source of truth; everything here
//!   can be rebuilt from it.
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`RemoteJobRow`] is what the remote store returns: bare foreign keys and
//! optional fields. The [`Enricher`] joins it against the local
//! [`ReferenceTables`] to produce a [`CachedJobRecord`] carrying display names.
//! Unknown references resolve to fixed sentinels, never to an error.
//!
//! ### Watermarks
//!
//! A [`Watermark`] is a canonical RFC3339 UTC timestamp with microsecond
//! precision, so string order equals time order. [`SyncMetadata`] holds the
//! last one and only ever moves it forward.
//!
//! ### Pass guard
//!
//! Bootstrap, delta, repair and full resync are mutually exclusive.
//! [`Store::begin_pass`] is the check-and-set; a second pass fails with
//! [`Error::SyncInProgress`].
//!
//! ### Revisions
//!
//! Every mutation that changes a table bumps its counter in [`Revisions`].
//! Live queries watch these counters to know when to recompute.
//!
//! ## Quick Start
//!
//! ```rust
//! use jobsync_engine::{
//!     Customer, Enricher, JobFilter, Pagination, ReferenceData, RemoteJobRow, Store,
//!     Watermark, UNASSIGNED,
//! };
//!
//! // 1. Refresh reference tables
//! let mut store = Store::new();
//! store.replace_references(ReferenceData {
//!     customers: vec![Customer {
//!         id: "c1".into(),
//!         name: "ACME".into(),
//!         email: None,
//!         phone: None,
//!         address: None,
//!     }],
//!     ..ReferenceData::default()
//! });
//!
//! // 2. Enrich and upsert a batch of remote rows
//! let row = RemoteJobRow {
//!     jo_number: Some("JO-0001".into()),
//!     customer_id: Some("c1".into()),
//!     salesman_id: Some("s-unknown".into()),
//!     created_at: Some(Watermark::parse("2024-03-01T08:00:00Z")),
//!     updated_at: Some(Watermark::parse("2024-03-01T08:00:00Z")),
//!     ..RemoteJobRow::minimal("job-1", None)
//! };
//! let records = Enricher::new(store.references()).enrich_batch(vec![row]);
//! assert_eq!(store.upsert_jobs(records), 1);
//!
//! let job = store.job("job-1").unwrap();
//! assert_eq!(job.customer_name, "ACME");
//! assert_eq!(job.salesman_name, UNASSIGNED);
//!
//! // 3. Query
//! let page = store
//!     .query_jobs()
//!     .filter(JobFilter {
//!         search: Some("acme".into()),
//!         ..JobFilter::default()
//!     })
//!     .paginate(Pagination::page(1, 20))
//!     .run()
//!     .unwrap();
//! assert_eq!(page.total, 1);
//! ```
//!
//! ## Persistence
//!
//! Use [`Store::export_state`] and [`Store::from_snapshot`] with
//! [`StoreSnapshot`]. Snapshots serialize to JSON with deterministic ordering
//! and older schema versions are migrated forward on load (see [`schema`]).

pub mod clock;
pub mod enrich;
pub mod error;
pub mod meta;
pub mod notification;
pub mod query;
pub mod reconcile;
pub mod record;
pub mod reference;
pub mod schema;
pub mod snapshot;
pub mod store;

// Re-export main types at crate root
pub use clock::Watermark;
pub use enrich::{is_placeholder, Enricher, NO_TITLE, SENTINELS, UNASSIGNED, UNKNOWN_CUSTOMER};
pub use error::Error;
pub use meta::{PassKind, PassRecord, SyncMetadata};
pub use notification::{
    AlertGate, NotificationKind, NotificationPatch, NotificationRecord, NotificationView,
};
pub use query::{FilterOptions, JobFilter, JobPage, JobQuery, Pagination, DEFAULT_PAGE_SIZE};
pub use reconcile::{RepairPlan, RepairReport};
pub use record::{ApprovalStatus, CachedJobRecord, JobStatus, Priority, RemoteJobRow};
pub use reference::{Customer, JobTitle, ReferenceData, ReferenceTables, StaffMember, StaffRole};
pub use schema::CURRENT_SCHEMA_VERSION;
pub use snapshot::{SnapshotMetadata, StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::{Revisions, Store, Table};

/// Type aliases for clarity
pub type RecordId = String;
pub type UserId = String;
pub type SchemaVersion = u32;
