//! The pass-overlap guard.

use chrono::Utc;
use jobsync_engine::{PassKind, Watermark};

use crate::error::Result;
use crate::local::LocalStore;

/// Ownership of the store's in-progress flag for one pass.
///
/// Claimed with a check-and-set under the store's write lock, so two passes
/// can never both hold it. A guard dropped without [`complete`](Self::complete)
/// or [`fail`](Self::fail) (the pass future was cancelled) releases the flag
/// from a spawned task.
#[derive(Debug)]
pub(crate) struct PassGuard {
    local: LocalStore,
    kind: PassKind,
    released: bool,
}

impl PassGuard {
    pub async fn acquire(local: &LocalStore, kind: PassKind) -> Result<Self> {
        let mut guard = Self {
            local: local.clone(),
            kind,
            released: false,
        };

        // a persistence error here still leaves the flag set in memory, so
        // the guard is dropped unreleased and clears it
        let claimed = local.write(|store| store.begin_pass(kind)).await?;
        if let Err(refused) = claimed {
            guard.released = true;
            return Err(refused.into());
        }

        Ok(guard)
    }

    pub fn kind(&self) -> PassKind {
        self.kind
    }

    /// Release after success, advancing the watermark if one is given.
    pub async fn complete(mut self, watermark: Option<Watermark>, changed: usize) -> Result<()> {
        self.released = true;
        let kind = self.kind;
        let finished_at = Watermark::from_datetime(Utc::now());
        self.local
            .write(move |store| store.complete_pass(kind, watermark, finished_at, changed))
            .await?;
        Ok(())
    }

    /// Release after failure. The watermark is untouched.
    pub async fn fail(mut self, message: String) -> Result<()> {
        self.released = true;
        self.local.write(move |store| store.fail_pass(message)).await?;
        Ok(())
    }
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let local = self.local.clone();
        let kind = self.kind;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tracing::warn!(pass = %kind, "sync pass cancelled, releasing guard");
                    if let Err(err) = local.write(|store| store.fail_pass("pass cancelled")).await {
                        tracing::error!(error = %err, "failed to persist cancelled pass");
                    }
                });
            }
            Err(_) => {
                tracing::error!(pass = %kind, "sync guard dropped outside a runtime");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn second_claim_is_refused() {
        let local = LocalStore::in_memory();
        let guard = PassGuard::acquire(&local, PassKind::Delta).await.unwrap();

        let err = PassGuard::acquire(&local, PassKind::Repair).await.unwrap_err();
        assert!(err.is_sync_in_progress());

        guard.complete(None, 0).await.unwrap();
        let meta = local.read(|store| store.sync_meta().clone()).await;
        assert!(!meta.in_progress);
    }

    #[tokio::test]
    async fn refused_claim_leaves_holder_alone() {
        let local = LocalStore::in_memory();
        let _guard = PassGuard::acquire(&local, PassKind::Bootstrap).await.unwrap();

        let refused = PassGuard::acquire(&local, PassKind::Delta).await;
        assert!(matches!(
            refused,
            Err(AppError::Engine(jobsync_engine::Error::SyncInProgress(
                PassKind::Bootstrap
            )))
        ));
        tokio::task::yield_now().await;

        let meta = local.read(|store| store.sync_meta().clone()).await;
        assert!(meta.in_progress);
        assert_eq!(meta.current_pass, Some(PassKind::Bootstrap));
    }

    #[tokio::test]
    async fn dropped_guard_releases_flag() {
        let local = LocalStore::in_memory();
        let mut rx = local.subscribe();
        {
            let _guard = PassGuard::acquire(&local, PassKind::Delta).await.unwrap();
        }
        rx.borrow_and_update();
        rx.changed().await.unwrap();

        let meta = local.read(|store| store.sync_meta().clone()).await;
        assert!(!meta.in_progress);
        assert_eq!(meta.last_error.as_deref(), Some("pass cancelled"));
    }
}
