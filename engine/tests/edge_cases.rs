//! Edge case tests for jobsync-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use jobsync_engine::{
    Customer, Enricher, Error, JobFilter, JobStatus, JobTitle, NotificationKind,
    NotificationPatch, NotificationRecord, Pagination, PassKind, ReferenceData, RemoteJobRow,
    RepairPlan, StaffMember, StaffRole, Store, StoreSnapshot, Table, Watermark, NO_TITLE,
    UNASSIGNED, UNKNOWN_CUSTOMER,
};

fn remote_row(id: &str, customer: Option<&str>, created: &str) -> RemoteJobRow {
    RemoteJobRow {
        jo_number: Some(format!("JO-{}", id)),
        customer_id: customer.map(str::to_string),
        status: Some(JobStatus::Pending),
        branch: Some("Main".into()),
        created_at: Some(Watermark::parse(created)),
        updated_at: Some(Watermark::parse(created)),
        ..RemoteJobRow::minimal(id, None)
    }
}

fn references() -> ReferenceData {
    ReferenceData::from_staff(
        vec![Customer {
            id: "c1".into(),
            name: "ACME Printing".into(),
            email: None,
            phone: None,
            address: None,
        }],
        vec![
            StaffMember {
                id: "s1".into(),
                name: "Maria".into(),
                email: None,
                role: StaffRole::Salesman,
            },
            StaffMember {
                id: "d1".into(),
                name: "Paolo".into(),
                email: None,
                role: StaffRole::Designer,
            },
        ],
        vec![JobTitle {
            id: "t1".into(),
            title: "Tarpaulin".into(),
            description: None,
        }],
    )
}

fn seeded_store() -> Store {
    let mut store = Store::new();
    store.replace_references(references());
    store
}

// ============================================================================
// Enrichment Edge Cases
// ============================================================================

#[test]
fn dangling_customer_still_cached() {
    let mut store = seeded_store();
    let rows = vec![remote_row("job-1", Some("c-deleted"), "2024-01-01T00:00:00Z")];

    let records = Enricher::new(store.references()).enrich_batch(rows);
    assert_eq!(store.upsert_jobs(records), 1);

    let job = store.job("job-1").unwrap();
    assert_eq!(job.customer_name, UNKNOWN_CUSTOMER);
    assert_eq!(job.salesman_name, UNASSIGNED);
    assert_eq!(job.designer_name, UNASSIGNED);
    assert_eq!(job.job_title, NO_TITLE);
    assert_eq!(job.customer_id.as_deref(), Some("c-deleted"));
}

#[test]
fn late_reference_resolves_on_next_pass() {
    let mut store = Store::new();
    let rows = vec![remote_row("job-1", Some("c1"), "2024-01-01T00:00:00Z")];

    let first = Enricher::new(store.references()).enrich_batch(rows.clone());
    store.upsert_jobs(first);
    assert_eq!(store.job("job-1").unwrap().customer_name, UNKNOWN_CUSTOMER);

    store.replace_references(references());
    let second = Enricher::new(store.references()).enrich_batch(rows);
    assert_eq!(store.upsert_jobs(second), 1);
    assert_eq!(store.job("job-1").unwrap().customer_name, "ACME Printing");
}

#[test]
fn minimal_row_enriches_to_defaults() {
    let store = Store::new();
    let row = RemoteJobRow::minimal("job-x", Some(Watermark::parse("2024-05-05T05:05:05Z")));
    let job = Enricher::new(store.references()).enrich(row);

    assert_eq!(job.jo_number, "");
    assert_eq!(job.total_amount, 0.0);
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.created_at, job.updated_at);
}

#[test]
fn unicode_search() {
    let mut store = seeded_store();
    let mut row = remote_row("job-1", Some("c1"), "2024-01-01T00:00:00Z");
    row.client_name = Some("Café Ñandú 日本語".into());
    row.details = Some("<p>Ünïcödé &amp; emoji 🎉</p>".into());
    let records = Enricher::new(store.references()).enrich_batch(vec![row]);
    store.upsert_jobs(records);

    for needle in ["café ñandú", "日本語", "ünïcödé & emoji"] {
        let filter = JobFilter {
            search: Some(needle.into()),
            ..JobFilter::default()
        };
        assert_eq!(
            store.query_jobs().filter(filter).count().unwrap(),
            1,
            "needle {:?}",
            needle
        );
    }
}

#[test]
fn very_long_details() {
    let mut store = seeded_store();
    let mut row = remote_row("job-1", Some("c1"), "2024-01-01T00:00:00Z");
    row.details = Some(format!("<div>{}</div>", "x".repeat(100_000)));
    let records = Enricher::new(store.references()).enrich_batch(vec![row]);
    store.upsert_jobs(records);

    assert_eq!(store.job("job-1").unwrap().details_plain.len(), 100_000);
}

// ============================================================================
// Store Edge Cases
// ============================================================================

#[test]
fn identical_upsert_does_not_bump_revision() {
    let mut store = seeded_store();
    let rows = vec![remote_row("job-1", Some("c1"), "2024-01-01T00:00:00Z")];
    let records = Enricher::new(store.references()).enrich_batch(rows);

    store.upsert_jobs(records.clone());
    let before = store.revisions().get(Table::Jobs);
    assert_eq!(store.upsert_jobs(records), 0);
    assert_eq!(store.revisions().get(Table::Jobs), before);
}

#[test]
fn guard_blocks_every_pass_kind() {
    let mut store = Store::new();
    store.begin_pass(PassKind::Bootstrap).unwrap();

    for kind in [
        PassKind::Bootstrap,
        PassKind::Delta,
        PassKind::Repair,
        PassKind::FullResync,
    ] {
        assert_eq!(
            store.begin_pass(kind),
            Err(Error::SyncInProgress(PassKind::Bootstrap))
        );
    }

    store.fail_pass("network down");
    assert!(store.begin_pass(PassKind::Delta).is_ok());
}

#[test]
fn clear_all_keeps_held_guard() {
    let mut store = seeded_store();
    let rows = vec![remote_row("job-1", Some("c1"), "2024-01-01T00:00:00Z")];
    let records = Enricher::new(store.references()).enrich_batch(rows);
    store.upsert_jobs(records);

    store.begin_pass(PassKind::FullResync).unwrap();
    store.clear_all();

    assert!(store.needs_bootstrap());
    assert!(store.references().is_empty());
    assert!(store.last_sync_time().is_none());
    assert!(store.sync_meta().in_progress);
}

#[test]
fn update_unknown_notification() {
    let mut store = Store::new();
    let result = store.update_notification("missing", &NotificationPatch::acknowledge());
    assert_eq!(
        result.map(|n| n.id.clone()),
        Err(Error::RecordNotFound("missing".into()))
    );
}

// ============================================================================
// Query Edge Cases
// ============================================================================

#[test]
fn page_size_larger_than_total() {
    let mut store = seeded_store();
    let rows = (0..5)
        .map(|i| remote_row(&format!("job-{}", i), Some("c1"), "2024-01-01T00:00:00Z"))
        .collect();
    let records = Enricher::new(store.references()).enrich_batch(rows);
    store.upsert_jobs(records);

    let page = store
        .query_jobs()
        .paginate(Pagination::page(1, 1000))
        .run()
        .unwrap();
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.total_pages, 1);
}

#[test]
fn same_created_at_orders_by_id() {
    let mut store = seeded_store();
    let rows = ["b", "c", "a"]
        .into_iter()
        .map(|id| remote_row(id, Some("c1"), "2024-01-01T00:00:00Z"))
        .collect();
    let records = Enricher::new(store.references()).enrich_batch(rows);
    store.upsert_jobs(records);

    let page = store.query_jobs().run().unwrap();
    let ids: Vec<_> = page.items.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn timestamps_with_offsets_compare_by_instant() {
    // 09:00+08:00 is 01:00Z, earlier than 02:00Z
    let early = Watermark::parse("2024-01-01T09:00:00+08:00");
    let late = Watermark::parse("2024-01-01T02:00:00Z");
    assert!(early < late);
}

// ============================================================================
// Snapshot Edge Cases
// ============================================================================

#[test]
fn snapshot_empty_store() {
    let store = Store::new();
    let snapshot = store.export_state();
    let json = snapshot.to_json().unwrap();
    let restored = Store::from_snapshot(StoreSnapshot::from_json(&json).unwrap());
    assert!(restored.needs_bootstrap());
    assert!(restored.last_sync_time().is_none());
}

#[test]
fn snapshot_drops_stale_in_progress_flag() {
    let mut store = seeded_store();
    store.begin_pass(PassKind::Delta).unwrap();

    let json = store.export_state().to_json().unwrap();
    let mut restored = Store::from_snapshot(StoreSnapshot::from_json(&json).unwrap());

    assert!(!restored.sync_meta().in_progress);
    assert!(restored.begin_pass(PassKind::Delta).is_ok());
}

#[test]
fn snapshot_keeps_notifications() {
    let mut store = Store::new();
    store.upsert_notifications([NotificationRecord {
        id: "n1".into(),
        user_id: "u1".into(),
        kind: NotificationKind::HighPriorityPending,
        message: "JO-0042 is waiting".into(),
        payload: serde_json::json!({"jobId": "job-42"}),
        read: false,
        snoozed_until: None,
        created_at: Watermark::parse("2024-01-01T00:00:00Z"),
    }]);

    let json = store.export_state().to_json().unwrap();
    let restored = Store::from_snapshot(StoreSnapshot::from_json(&json).unwrap());
    let note = restored.notification("n1").unwrap();
    assert_eq!(note.payload["jobId"], "job-42");
    assert_eq!(restored.notifications_for("u1").count(), 1);
    assert_eq!(restored.notifications_for("u2").count(), 0);
}

// ============================================================================
// Repair Edge Cases
// ============================================================================

#[test]
fn repair_against_empty_remote_prunes_everything() {
    let mut store = seeded_store();
    let rows = (0..3)
        .map(|i| remote_row(&format!("job-{}", i), Some("c1"), "2024-01-01T00:00:00Z"))
        .collect();
    let records = Enricher::new(store.references()).enrich_batch(rows);
    store.upsert_jobs(records);

    let plan = RepairPlan::compute(&store.job_versions(), &Vec::<RemoteJobRow>::new());
    assert!(plan.missing.is_empty());
    assert_eq!(plan.orphans.len(), 3);

    assert_eq!(store.remove_jobs(&plan.orphans), 3);
    assert!(store.needs_bootstrap());
}
