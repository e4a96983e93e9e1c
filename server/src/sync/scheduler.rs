//! The recurring background delta.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::SyncEngine;

#[derive(Debug)]
enum SchedulerState {
    Stopped,
    Running {
        stop: watch::Sender<bool>,
        task: JoinHandle<()>,
    },
}

/// Owns the single recurring delta timer of the process.
///
/// `Stopped -> Running` on [`start`](Self::start), back on
/// [`stop`](Self::stop). Both transitions are idempotent.
#[derive(Debug)]
pub struct BackgroundScheduler {
    engine: SyncEngine,
    interval: Duration,
    state: Mutex<SchedulerState>,
}

impl BackgroundScheduler {
    pub fn new(engine: SyncEngine) -> Self {
        let interval = engine.config().interval;
        Self::with_interval(engine, interval)
    }

    pub fn with_interval(engine: SyncEngine, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            state: Mutex::new(SchedulerState::Stopped),
        }
    }

    /// Start the timer. Returns false if it was already running.
    pub fn start(&self) -> bool {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if matches!(*state, SchedulerState::Running { .. }) {
            tracing::debug!("background sync already running");
            return false;
        }

        let (stop, stopped) = watch::channel(false);
        let task = tokio::spawn(run(self.engine.clone(), self.interval, stopped));
        *state = SchedulerState::Running { stop, task };
        tracing::info!(interval_secs = self.interval.as_secs(), "background sync started");
        true
    }

    /// Stop the timer. Returns false if it was not running.
    ///
    /// A delta already in flight is allowed to finish and write its results;
    /// only future ticks are cancelled.
    pub fn stop(&self) -> bool {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        match std::mem::replace(&mut *state, SchedulerState::Stopped) {
            SchedulerState::Running { stop, task } => {
                let _ = stop.send(true);
                // the task exits on its own after any in-flight pass
                drop(task);
                tracing::info!("background sync stopped");
                true
            }
            SchedulerState::Stopped => false,
        }
    }

    pub fn is_running(&self) -> bool {
        match self.state.lock() {
            Ok(state) => matches!(*state, SchedulerState::Running { .. }),
            Err(poisoned) => matches!(*poisoned.into_inner(), SchedulerState::Running { .. }),
        }
    }
}

impl Drop for BackgroundScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(engine: SyncEngine, period: Duration, mut stopped: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick fires immediately; startup already ran a pass
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = stopped.changed() => {
                if changed.is_err() || *stopped.borrow() {
                    break;
                }
                continue;
            }
        }

        // outside the select so stop() never aborts a running pass
        match engine.delta().await {
            Ok(changed) => tracing::debug!(changed, "background delta finished"),
            Err(err) if err.is_sync_in_progress() => {
                tracing::debug!("background delta skipped, another pass is running");
            }
            Err(err) => tracing::warn!(error = %err, "background delta failed"),
        }

        if *stopped.borrow() {
            break;
        }
    }

    tracing::debug!("background sync loop exited");
}
