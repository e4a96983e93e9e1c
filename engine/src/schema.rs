//! Schema versions and forward migrations of the persisted table set.
//!
//! Migrations run on the raw JSON document before typed decoding, one
//! version step at a time, so an older cache loads without losing data.
//!
//! History:
//! - v1: jobs, customers, salesmen, designers, jobTitles, syncMeta
//! - v2: adds the notifications table
//! - v3: adds `detailsPlain` on jobs and `lastError` on syncMeta

use crate::record::strip_markup;
use crate::{error::Result, Error, SchemaVersion};
use serde_json::{Map, Value};

/// The schema version this build reads and writes.
pub const CURRENT_SCHEMA_VERSION: SchemaVersion = 3;

/// One forward step from `from` to `from + 1`.
pub struct Migration {
    pub from: SchemaVersion,
    pub description: &'static str,
    apply: fn(&mut Map<String, Value>) -> Result<()>,
}

/// All migration steps in order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        from: 1,
        description: "add notifications table",
        apply: add_notifications_table,
    },
    Migration {
        from: 2,
        description: "add plain-text details and last sync error",
        apply: add_plain_details_and_last_error,
    },
];

/// Read the schema version of a raw snapshot document. Absent means v1.
pub fn schema_version_of(doc: &Value) -> Result<SchemaVersion> {
    match doc.get("schemaVersion") {
        None | Some(Value::Null) => Ok(1),
        Some(v) => v
            .as_u64()
            .and_then(|v| SchemaVersion::try_from(v).ok())
            .ok_or_else(|| Error::InvalidSnapshot(format!("bad schemaVersion: {}", v))),
    }
}

/// Migrate a raw snapshot document to [`CURRENT_SCHEMA_VERSION`].
///
/// Returns the version the document started at.
pub fn migrate(doc: &mut Value) -> Result<SchemaVersion> {
    let original = schema_version_of(doc)?;
    if original > CURRENT_SCHEMA_VERSION {
        return Err(Error::SchemaTooNew {
            supported: CURRENT_SCHEMA_VERSION,
            actual: original,
        });
    }

    let obj = doc
        .as_object_mut()
        .ok_or_else(|| Error::InvalidSnapshot("snapshot must be an object".into()))?;

    let mut version = original;
    while version < CURRENT_SCHEMA_VERSION {
        let step = MIGRATIONS
            .iter()
            .find(|m| m.from == version)
            .ok_or_else(|| {
                Error::InvalidSnapshot(format!("no migration from schema version {}", version))
            })?;
        (step.apply)(obj)?;
        version += 1;
        obj.insert("schemaVersion".into(), Value::from(version));
    }

    Ok(original)
}

fn add_notifications_table(doc: &mut Map<String, Value>) -> Result<()> {
    doc.entry("notifications")
        .or_insert_with(|| Value::Object(Map::new()));
    Ok(())
}

fn add_plain_details_and_last_error(doc: &mut Map<String, Value>) -> Result<()> {
    if let Some(jobs) = doc.get_mut("jobs").and_then(Value::as_object_mut) {
        for job in jobs.values_mut() {
            let Some(job) = job.as_object_mut() else {
                return Err(Error::InvalidSnapshot("job entry must be an object".into()));
            };
            if job.contains_key("detailsPlain") {
                continue;
            }
            let plain = job
                .get("details")
                .and_then(Value::as_str)
                .map(strip_markup)
                .unwrap_or_default();
            job.insert("detailsPlain".into(), Value::String(plain));
        }
    }

    if let Some(meta) = doc.get_mut("syncMeta").and_then(Value::as_object_mut) {
        meta.entry("lastError").or_insert(Value::Null);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn steps_are_contiguous() {
        for (i, step) in MIGRATIONS.iter().enumerate() {
            assert_eq!(step.from, i as SchemaVersion + 1, "{}", step.description);
        }
        assert_eq!(
            MIGRATIONS.len() as SchemaVersion + 1,
            CURRENT_SCHEMA_VERSION
        );
    }

    #[test]
    fn migrate_v1_document() {
        let mut doc = json!({
            "formatVersion": 1,
            "jobs": {
                "job-1": {"id": "job-1", "details": "<p>Die-cut&nbsp;stickers</p>"}
            },
            "syncMeta": {"lastSyncTime": "2024-01-01T00:00:00.000000Z", "inProgress": false}
        });

        let original = migrate(&mut doc).unwrap();
        assert_eq!(original, 1);
        assert_eq!(doc["schemaVersion"], CURRENT_SCHEMA_VERSION);
        assert_eq!(doc["notifications"], json!({}));
        assert_eq!(doc["jobs"]["job-1"]["detailsPlain"], "Die-cut stickers");
        assert_eq!(doc["syncMeta"]["lastError"], Value::Null);
        // Existing data untouched
        assert_eq!(
            doc["syncMeta"]["lastSyncTime"],
            "2024-01-01T00:00:00.000000Z"
        );
    }

    #[test]
    fn migrate_keeps_existing_plain_details() {
        let mut doc = json!({
            "schemaVersion": 2,
            "jobs": {"j": {"details": "<b>x</b>", "detailsPlain": "typed"}},
            "notifications": {"n1": {"id": "n1"}}
        });
        migrate(&mut doc).unwrap();
        assert_eq!(doc["jobs"]["j"]["detailsPlain"], "typed");
        assert_eq!(doc["notifications"]["n1"]["id"], "n1");
    }

    #[test]
    fn current_version_is_noop() {
        let mut doc = json!({"schemaVersion": CURRENT_SCHEMA_VERSION, "jobs": {}});
        let before = doc.clone();
        migrate(&mut doc).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn reject_newer_schema() {
        let mut doc = json!({"schemaVersion": 99});
        assert!(matches!(
            migrate(&mut doc),
            Err(Error::SchemaTooNew { actual: 99, .. })
        ));
    }

    #[test]
    fn reject_non_object() {
        let mut doc = json!([1, 2, 3]);
        assert!(matches!(migrate(&mut doc), Err(Error::InvalidSnapshot(_))));
    }
}
