//! Repair planning: diffing the remote identifier set against the cache.
//!
//! This is the convergence backstop for anything delta sync missed. Given
//! the minimal projection of every remote job (id + modification time) and
//! the cached versions, it produces a deterministic plan.
//!
//! # Algorithm
//!
//! 1. `missing` = remote ids not cached
//! 2. `stale` = cached ids whose modification time is older than remote
//! 3. `orphans` = cached ids no longer present remotely
//! 4. All three lists are sorted so the plan is independent of input order

use crate::{RecordId, RemoteJobRow, Watermark};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// What a repair pass has to do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairPlan {
    /// Present remotely, absent locally
    pub missing: Vec<RecordId>,
    /// Cached with an older modification time than remote
    pub stale: Vec<RecordId>,
    /// Cached but gone remotely
    pub orphans: Vec<RecordId>,
}

impl RepairPlan {
    /// Diff the minimal remote projection against cached versions.
    pub fn compute<'a>(
        local: &HashMap<RecordId, Watermark>,
        remote: impl IntoIterator<Item = &'a RemoteJobRow>,
    ) -> Self {
        let mut plan = RepairPlan::default();
        let mut seen: HashSet<&str> = HashSet::new();

        for row in remote {
            if !seen.insert(row.id.as_str()) {
                continue;
            }
            match local.get(&row.id) {
                None => plan.missing.push(row.id.clone()),
                Some(cached) => {
                    if row.updated_at.as_ref().is_some_and(|remote| cached < remote) {
                        plan.stale.push(row.id.clone());
                    }
                }
            }
        }

        plan.orphans = local
            .keys()
            .filter(|id| !seen.contains(id.as_str()))
            .cloned()
            .collect();

        plan.missing.sort();
        plan.stale.sort();
        plan.orphans.sort();
        plan
    }

    /// Nothing to fetch and nothing to prune.
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty() && self.orphans.is_empty()
    }

    /// Identifiers that need a full fetch, missing first.
    pub fn to_fetch(&self) -> Vec<RecordId> {
        self.missing.iter().chain(&self.stale).cloned().collect()
    }

    /// Fetch list split into batches of at most `batch_size` (minimum 1).
    pub fn fetch_batches(&self, batch_size: usize) -> Vec<Vec<RecordId>> {
        self.to_fetch()
            .chunks(batch_size.max(1))
            .map(<[RecordId]>::to_vec)
            .collect()
    }
}

/// Outcome of a repair pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    /// Missing records fetched and cached
    pub repaired: usize,
    /// Stale records re-fetched
    pub stale_refreshed: usize,
    /// Orphans removed from the cache
    pub pruned: usize,
}

impl RepairReport {
    /// Total number of records the pass changed.
    pub fn changed(&self) -> usize {
        self.repaired + self.stale_refreshed + self.pruned
    }
}
