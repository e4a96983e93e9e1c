//! Sync metadata: the watermark and the pass-overlap guard.

use crate::{error::Result, Error, Watermark};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of sync pass that mutate the cache in bulk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Bootstrap,
    Delta,
    Repair,
    FullResync,
}

impl PassKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassKind::Bootstrap => "bootstrap",
            PassKind::Delta => "delta",
            PassKind::Repair => "repair",
            PassKind::FullResync => "full_resync",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the most recent completed pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassRecord {
    pub kind: PassKind,
    pub finished_at: Watermark,
    /// Records written (or repaired) by the pass.
    pub changed: usize,
}

/// The singleton `syncMeta` record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    /// Watermark of the last successful bootstrap or delta fetch.
    #[serde(default)]
    pub last_sync_time: Option<Watermark>,
    /// Set while a bootstrap, delta, repair or resync pass runs.
    #[serde(default)]
    pub in_progress: bool,
    #[serde(default)]
    pub current_pass: Option<PassKind>,
    #[serde(default)]
    pub last_pass: Option<PassRecord>,
    /// Message of the last failed pass; cleared by the next success.
    #[serde(default)]
    pub last_error: Option<String>,
}

impl SyncMetadata {
    /// Check-and-set the in-progress flag.
    pub fn begin(&mut self, kind: PassKind) -> Result<()> {
        if self.in_progress {
            return Err(Error::SyncInProgress(self.current_pass.unwrap_or(kind)));
        }
        self.in_progress = true;
        self.current_pass = Some(kind);
        Ok(())
    }

    /// Finish a pass successfully, advancing the watermark if one is given.
    ///
    /// The watermark never moves backward.
    pub fn complete(
        &mut self,
        kind: PassKind,
        watermark: Option<Watermark>,
        finished_at: Watermark,
        changed: usize,
    ) {
        self.last_sync_time = Watermark::latest(self.last_sync_time.take(), watermark);
        self.in_progress = false;
        self.current_pass = None;
        self.last_error = None;
        self.last_pass = Some(PassRecord {
            kind,
            finished_at,
            changed,
        });
    }

    /// Finish a pass that failed. The watermark is left untouched.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.in_progress = false;
        self.current_pass = None;
        self.last_error = Some(message.into());
    }

    /// Drop an in-progress flag inherited from a process that died mid-pass.
    pub fn clear_stale_flag(&mut self) {
        self.in_progress = false;
        self.current_pass = None;
    }
}
