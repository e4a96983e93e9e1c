//! Notification records and the rules for what counts as "active".

use crate::{RecordId, UserId, Watermark};
use serde::{Deserialize, Serialize};

/// Kind of notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A high-priority job is waiting; triggers the alert cue.
    HighPriorityPending,
    JobAssigned,
    ApprovalRequested,
    StatusChanged,
    #[default]
    General,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::HighPriorityPending => "high_priority_pending",
            NotificationKind::JobAssigned => "job_assigned",
            NotificationKind::ApprovalRequested => "approval_requested",
            NotificationKind::StatusChanged => "status_changed",
            NotificationKind::General => "general",
        }
    }

    /// Parse a remote type string; unknown kinds are plain notifications.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "high_priority_pending" => NotificationKind::HighPriorityPending,
            "job_assigned" => NotificationKind::JobAssigned,
            "approval_requested" => NotificationKind::ApprovalRequested,
            "status_changed" => NotificationKind::StatusChanged,
            _ => NotificationKind::General,
        }
    }
}

/// A notification as cached locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: RecordId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub read: bool,
    #[serde(default)]
    pub snoozed_until: Option<Watermark>,
    pub created_at: Watermark,
}

impl NotificationRecord {
    /// Unread and not currently snoozed.
    pub fn is_active(&self, now: &Watermark) -> bool {
        !self.read && !self.is_snoozed(now)
    }

    /// Snoozed with a deadline still in the future.
    pub fn is_snoozed(&self, now: &Watermark) -> bool {
        self.snoozed_until
            .as_ref()
            .is_some_and(|until| until > now)
    }

    /// Apply a partial update.
    pub fn apply(&mut self, patch: &NotificationPatch) {
        if let Some(read) = patch.read {
            self.read = read;
        }
        if let Some(snoozed_until) = &patch.snoozed_until {
            self.snoozed_until = snoozed_until.clone();
        }
    }
}

/// A partial update to a notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    /// `Some(None)` clears the snooze.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snoozed_until: Option<Option<Watermark>>,
}

impl NotificationPatch {
    pub fn acknowledge() -> Self {
        Self {
            read: Some(true),
            snoozed_until: None,
        }
    }

    pub fn snooze(until: Watermark) -> Self {
        Self {
            read: None,
            snoozed_until: Some(Some(until)),
        }
    }
}

/// What the notification UI shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    /// Unread, unsnoozed, newest first.
    pub active: Vec<NotificationRecord>,
    /// Most recent notifications regardless of state, newest first.
    pub history: Vec<NotificationRecord>,
    pub unread_count: usize,
    pub high_priority_pending: usize,
}

impl NotificationView {
    /// Build the view from all cached notifications of one user.
    pub fn build<'a>(
        records: impl IntoIterator<Item = &'a NotificationRecord>,
        now: &Watermark,
        history_limit: usize,
    ) -> Self {
        let mut all: Vec<&NotificationRecord> = records.into_iter().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let active: Vec<NotificationRecord> = all
            .iter()
            .filter(|n| n.is_active(now))
            .map(|n| (*n).clone())
            .collect();
        let high_priority_pending = active
            .iter()
            .filter(|n| n.kind == NotificationKind::HighPriorityPending)
            .count();

        Self {
            unread_count: all.iter().filter(|n| !n.read).count(),
            history: all.iter().take(history_limit).map(|n| (*n).clone()).collect(),
            active,
            high_priority_pending,
        }
    }
}

/// Decides when the high-priority alert cue plays.
///
/// The cue plays once per unseen batch: after it fires it stays quiet until
/// a new notification arrives or something is snoozed.
#[derive(Debug, Clone, Default)]
pub struct AlertGate {
    played: bool,
}

impl AlertGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new notification arrived.
    pub fn on_arrival(&mut self) {
        self.played = false;
    }

    /// One or more notifications were snoozed.
    pub fn on_snooze(&mut self) {
        self.played = false;
    }

    /// Returns true exactly when the cue should play now.
    pub fn should_cue(&mut self, view: &NotificationView) -> bool {
        if view.high_priority_pending > 0 && !self.played {
            self.played = true;
            return true;
        }
        false
    }

    pub fn has_played(&self) -> bool {
        self.played
    }
}
