//! Realtime notification mirror for the current user.
//!
//! Same shape as the job sync, driven by pushes instead of a timer: one
//! initial fetch, then every row the remote announces is appended to the
//! cache. Acknowledge and snooze write to the remote first and then to the
//! cache, so a failed remote write leaves the cache untouched.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use jobsync_engine::{
    AlertGate, NotificationKind, NotificationPatch, NotificationView, RecordId, Store, Table,
    UserId, Watermark,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::live::LiveQuery;
use crate::local::LocalStore;
use crate::remote::{NotificationFeed, RemoteSource};

const CUE_CAPACITY: usize = 16;
/// Live views also refresh on this period so expired snoozes resurface.
const SNOOZE_RECHECK: Duration = Duration::from_secs(30);

/// Signal to play the high-priority audio/haptic cue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertCue {
    pub pending: usize,
    pub notification_ids: Vec<RecordId>,
}

fn now() -> Watermark {
    Watermark::from_datetime(Utc::now())
}

/// Shared by the sync handle and its listener task.
#[derive(Debug, Clone)]
struct Mirror {
    local: LocalStore,
    user_id: UserId,
    history_limit: usize,
    gate: Arc<Mutex<AlertGate>>,
    cues: broadcast::Sender<AlertCue>,
}

impl Mirror {
    fn build_view(&self, store: &Store) -> NotificationView {
        NotificationView::build(store.notifications_for(&self.user_id), &now(), self.history_limit)
    }

    async fn view(&self) -> NotificationView {
        self.local.read(|store| self.build_view(store)).await
    }

    async fn evaluate_cue(&self) {
        let view = self.view().await;
        let should_cue = match self.gate.lock() {
            Ok(mut gate) => gate.should_cue(&view),
            Err(poisoned) => poisoned.into_inner().should_cue(&view),
        };
        if !should_cue {
            return;
        }

        let notification_ids: Vec<RecordId> = view
            .active
            .iter()
            .filter(|n| n.kind == NotificationKind::HighPriorityPending)
            .map(|n| n.id.clone())
            .collect();
        tracing::info!(pending = view.high_priority_pending, "high priority alert cue");
        let _ = self.cues.send(AlertCue {
            pending: view.high_priority_pending,
            notification_ids,
        });
    }

    fn with_gate(&self, f: impl FnOnce(&mut AlertGate)) {
        match self.gate.lock() {
            Ok(mut gate) => f(&mut gate),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    async fn consume(self, mut feed: NotificationFeed) {
        while let Some(record) = feed.recv().await {
            let id = record.id.clone();
            match self.local.write(|store| store.upsert_notifications([record])).await {
                Ok(changed) => {
                    tracing::debug!(notification_id = %id, changed, "notification pushed");
                    self.with_gate(AlertGate::on_arrival);
                    self.evaluate_cue().await;
                }
                Err(err) => tracing::error!(error = %err, "failed to store pushed notification"),
            }
        }
        tracing::info!(user_id = %self.user_id, "notification feed ended");
    }
}

/// Mirrors one user's notifications and raises the alert cue.
pub struct NotificationSync {
    remote: Arc<dyn RemoteSource>,
    mirror: Mirror,
    snooze: Duration,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for NotificationSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSync")
            .field("user_id", &self.mirror.user_id)
            .field("snooze", &self.snooze)
            .finish_non_exhaustive()
    }
}

impl NotificationSync {
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        local: LocalStore,
        user_id: impl Into<UserId>,
        snooze: Duration,
        history_limit: usize,
    ) -> Self {
        let (cues, _) = broadcast::channel(CUE_CAPACITY);
        Self {
            remote,
            mirror: Mirror {
                local,
                user_id: user_id.into(),
                history_limit,
                gate: Arc::new(Mutex::new(AlertGate::new())),
                cues,
            },
            snooze,
            listener: Mutex::new(None),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.mirror.user_id
    }

    /// One-shot fetch of the user's recent notifications.
    pub async fn sync_initial(&self) -> Result<usize> {
        let records = self
            .remote
            .fetch_notifications(&self.mirror.user_id, self.mirror.history_limit)
            .await?;
        let fetched = records.len();
        let changed = self
            .mirror
            .local
            .write(move |store| store.upsert_notifications(records))
            .await?;
        tracing::info!(fetched, changed, "notifications synced");
        self.mirror.evaluate_cue().await;
        Ok(changed)
    }

    /// Initial sync, then follow the push channel.
    ///
    /// Calling this while already listening is a no-op.
    pub async fn start(&self) -> Result<()> {
        if self.is_listening() {
            return Ok(());
        }

        if let Err(err) = self.sync_initial().await {
            tracing::warn!(error = %err, "initial notification sync failed");
        }

        let feed = self
            .remote
            .subscribe_notifications(&self.mirror.user_id)
            .await?;
        let task = tokio::spawn(self.mirror.clone().consume(feed));

        let mut listener = self.lock_listener();
        if let Some(previous) = listener.replace(task) {
            previous.abort();
        }
        tracing::info!(user_id = %self.mirror.user_id, "notification listener started");
        Ok(())
    }

    /// Stop following pushes. Safe to call when not started.
    pub fn stop(&self) -> bool {
        match self.lock_listener().take() {
            Some(task) => {
                task.abort();
                tracing::info!("notification listener stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.lock_listener()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Active notifications and recent history right now.
    pub async fn view(&self) -> NotificationView {
        self.mirror.view().await
    }

    /// A view that follows cache changes and snooze expiry.
    pub async fn live(&self) -> Result<LiveQuery<NotificationView>> {
        let mirror = self.mirror.clone();
        LiveQuery::spawn(
            self.mirror.local.clone(),
            &[Table::Notifications],
            Some(SNOOZE_RECHECK),
            move |store| Ok(mirror.build_view(store)),
        )
        .await
    }

    pub fn subscribe_cues(&self) -> broadcast::Receiver<AlertCue> {
        self.mirror.cues.subscribe()
    }

    /// Mark one notification read.
    pub async fn acknowledge(&self, id: &str) -> Result<()> {
        self.apply(id, NotificationPatch::acknowledge()).await
    }

    /// Hide one notification until the snooze period has passed.
    pub async fn snooze(&self, id: &str) -> Result<()> {
        self.apply(id, NotificationPatch::snooze(self.snooze_deadline()))
            .await?;
        self.mirror.with_gate(AlertGate::on_snooze);
        self.mirror.evaluate_cue().await;
        Ok(())
    }

    /// Acknowledge every active notification. Returns how many.
    pub async fn acknowledge_all(&self) -> Result<usize> {
        let ids = self.active_ids().await;
        for id in &ids {
            self.apply(id, NotificationPatch::acknowledge()).await?;
        }
        Ok(ids.len())
    }

    /// Snooze every active notification. Returns how many.
    pub async fn snooze_all(&self) -> Result<usize> {
        let ids = self.active_ids().await;
        let patch = NotificationPatch::snooze(self.snooze_deadline());
        for id in &ids {
            self.apply(id, patch.clone()).await?;
        }
        if !ids.is_empty() {
            self.mirror.with_gate(AlertGate::on_snooze);
            self.mirror.evaluate_cue().await;
        }
        Ok(ids.len())
    }

    async fn active_ids(&self) -> Vec<RecordId> {
        self.view().await.active.into_iter().map(|n| n.id).collect()
    }

    fn snooze_deadline(&self) -> Watermark {
        let snooze = chrono::Duration::seconds(self.snooze.as_secs() as i64);
        Watermark::from_datetime(Utc::now() + snooze)
    }

    async fn apply(&self, id: &str, patch: NotificationPatch) -> Result<()> {
        let known = self
            .mirror
            .local
            .read(|store| {
                store
                    .notification(id)
                    .is_some_and(|n| n.user_id == self.mirror.user_id)
            })
            .await;
        if !known {
            return Err(AppError::NotFound(format!("notification {}", id)));
        }

        self.remote.update_notification(id, &patch).await?;
        self.mirror
            .local
            .write(|store| store.update_notification(id, &patch).map(|_| ()))
            .await??;
        Ok(())
    }

    fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.listener.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for NotificationSync {
    fn drop(&mut self) {
        self.stop();
    }
}
