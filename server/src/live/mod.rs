//! Live queries over the local cache.
//!
//! A [`LiveQuery`] owns a spawned task that recomputes its result whenever
//! one of the tables it reads changes (and, optionally, on a fixed period
//! for results that depend on the clock). Results are published on a
//! `watch` channel; the task exits once every receiver is gone.

mod jobs;

pub use jobs::{job_page, live_jobs, JobView};

use std::future;
use std::sync::Arc;
use std::time::Duration;

use jobsync_engine::{Revisions, Store, Table};
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::error::Result;
use crate::local::LocalStore;

/// A continuously recomputed view of the cache.
#[derive(Debug)]
pub struct LiveQuery<T> {
    rx: watch::Receiver<Arc<T>>,
}

impl<T> Clone for LiveQuery<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> LiveQuery<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    /// Compute the first result and start tracking `tables`.
    ///
    /// An error from the first computation is returned to the caller. Later
    /// errors keep the previous result and are logged.
    pub async fn spawn<F>(
        local: LocalStore,
        tables: &'static [Table],
        refresh: Option<Duration>,
        compute: F,
    ) -> Result<Self>
    where
        F: Fn(&Store) -> jobsync_engine::error::Result<T> + Send + Sync + 'static,
    {
        let mut revisions = local.subscribe();
        let seen = versions(&revisions.borrow_and_update(), tables);
        let initial = local.read(&compute).await?;
        let (tx, rx) = watch::channel(Arc::new(initial));

        tokio::spawn(async move {
            let mut seen = seen;
            let mut ticker = refresh.map(|period| {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                ticker
            });

            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    changed = revisions.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let current = versions(&revisions.borrow_and_update(), tables);
                        if current == seen {
                            continue;
                        }
                        seen = current;
                    }
                    _ = tick(&mut ticker) => {}
                }

                match local.read(&compute).await {
                    Ok(value) => {
                        tx.send_if_modified(|current| {
                            if **current == value {
                                return false;
                            }
                            *current = Arc::new(value);
                            true
                        });
                    }
                    Err(err) => tracing::warn!(error = %err, "live query recompute failed"),
                }
            }

            tracing::trace!("live query closed");
        });

        Ok(Self { rx })
    }
}

impl<T> LiveQuery<T> {
    /// The latest result.
    pub fn current(&self) -> Arc<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next result that differs from the last one seen.
    ///
    /// Returns `None` once the query task has stopped.
    pub async fn next(&mut self) -> Option<Arc<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

fn versions(revisions: &Revisions, tables: &[Table]) -> Vec<u64> {
    tables.iter().map(|table| revisions.get(*table)).collect()
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsync_engine::{PassKind, Watermark};

    fn last_sync(store: &Store) -> jobsync_engine::error::Result<Option<Watermark>> {
        Ok(store.last_sync_time().cloned())
    }

    #[tokio::test]
    async fn recomputes_on_relevant_change() {
        let local = LocalStore::in_memory();
        let mut query = LiveQuery::spawn(local.clone(), &[Table::SyncMeta], None, last_sync)
            .await
            .unwrap();
        assert_eq!(*query.current(), None);

        local
            .write(|store| {
                store.begin_pass(PassKind::Delta)?;
                store.complete_pass(
                    PassKind::Delta,
                    Some(Watermark::parse("2024-05-01T00:00:00Z")),
                    Watermark::parse("2024-05-01T00:00:01Z"),
                    0,
                );
                Ok::<_, jobsync_engine::Error>(())
            })
            .await
            .unwrap()
            .unwrap();

        let next = query.next().await.unwrap();
        assert_eq!(*next, Some(Watermark::parse("2024-05-01T00:00:00Z")));
    }

    #[tokio::test]
    async fn first_error_is_returned() {
        let local = LocalStore::in_memory();
        let result = LiveQuery::<()>::spawn(local, &[Table::Jobs], None, |_| {
            Err(jobsync_engine::Error::invalid_field("status", "archived"))
        })
        .await;
        assert!(result.is_err());
    }
}
