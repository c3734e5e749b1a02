//! One-shot update of a service's tasks.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ─► Diffing ─┬─► Dispatching ─► Draining ─► Done
//!                  └─► Done                  (nothing dirty)
//! ```
//!
//! `Dispatching` feeds dirty tasks, in order, into a queue shared by the
//! worker pool. `Draining` closes the queue and waits for the workers.
//! Cancellation stops the feed, preempts every worker wait, and lets the
//! state machine fall through to `Done`.

use std::sync::Arc;
use std::time::Duration;

use rollout_events::WatchQueue;
use rollout_model::{Service, Task};
use rollout_state::Store;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::replace::{replace_task, replacement_for, ReplaceOutcome};
use crate::{dirty_tasks, UpdaterConfig};

// =============================================================================
// State and Report
// =============================================================================

/// Updater lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterState {
    Idle,
    Diffing,
    Dispatching,
    Draining,
    Done,
}

/// Summary of one update run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Stale tasks found by the diff.
    pub dirty: usize,
    /// Tasks a worker picked up. A task still queued when the update was
    /// cancelled is not counted.
    pub dispatched: usize,
    /// Replacements that came up running.
    pub replaced: usize,
    /// Replacements whose transaction or watch failed.
    pub failed: usize,
    /// Replacements abandoned by cancellation.
    pub interrupted: usize,
    /// Whether the run was cancelled.
    pub cancelled: bool,
}

impl UpdateReport {
    fn absorb(&mut self, worker: WorkerStats) {
        self.dispatched += worker.dispatched;
        self.replaced += worker.replaced;
        self.failed += worker.failed;
        self.interrupted += worker.interrupted;
    }
}

#[derive(Debug, Default)]
struct WorkerStats {
    dispatched: usize,
    replaced: usize,
    failed: usize,
    interrupted: usize,
}

// =============================================================================
// Updater
// =============================================================================

/// Drives one update from diff to completion.
///
/// An updater runs at most once. [`Updater::cancel`] may be called from any
/// task, any number of times, before, during or after the run.
pub struct Updater {
    store: Arc<dyn Store>,
    watch_queue: WatchQueue,
    config: UpdaterConfig,
    stop: CancellationToken,
    state: watch::Sender<UpdaterState>,
}

impl Updater {
    pub fn new(store: Arc<dyn Store>, config: UpdaterConfig) -> Self {
        let watch_queue = store.watch_queue();
        let (state, _) = watch::channel(UpdaterState::Idle);
        Self {
            store,
            watch_queue,
            config,
            stop: CancellationToken::new(),
            state,
        }
    }

    pub fn state(&self) -> UpdaterState {
        *self.state.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Raises the cancellation signal without waiting.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Raises the cancellation signal and waits until the run is done.
    ///
    /// Only returns once [`Updater::run`] has been called and has finished.
    pub async fn cancel(&self) {
        self.stop.cancel();
        self.wait().await;
    }

    /// Waits until the run is done.
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|s| *s == UpdaterState::Done).await;
    }

    /// Replaces every stale task in `tasks` and returns once all
    /// replacements finished or the update was cancelled.
    #[instrument(skip_all, fields(service.id = %service.id, tasks = tasks.len()))]
    pub async fn run(&self, service: &Service, tasks: &[Task]) -> UpdateReport {
        let started = self.state.send_if_modified(|s| {
            if *s == UpdaterState::Idle {
                *s = UpdaterState::Diffing;
                true
            } else {
                false
            }
        });
        if !started {
            warn!(state = ?self.state(), "updater already ran, ignoring");
            return UpdateReport::default();
        }
        let _done = DoneGuard(&self.state);

        let dirty = dirty_tasks(service, tasks);
        let mut report = UpdateReport {
            dirty: dirty.len(),
            ..UpdateReport::default()
        };
        if dirty.is_empty() {
            debug!("all tasks up to date");
            return report;
        }

        let policy = self.config.policy_for(service.spec.update.as_ref());
        let parallelism = policy.workers_for(dirty.len());
        info!(
            dirty = dirty.len(),
            parallelism,
            delay_ms = u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
            "starting update"
        );

        self.state.send_replace(UpdaterState::Dispatching);

        let (tx, rx) = mpsc::channel::<Task>(1);
        let rx = Arc::new(Mutex::new(rx));
        let service = Arc::new(service.clone());
        let mut workers = JoinSet::new();
        for slot in 0..parallelism {
            let worker = Worker {
                slot,
                store: Arc::clone(&self.store),
                watch_queue: self.watch_queue.clone(),
                stop: self.stop.clone(),
                service: Arc::clone(&service),
                queue: Arc::clone(&rx),
                delay: policy.delay,
            };
            workers.spawn(worker.run());
        }

        for task in dirty {
            tokio::select! {
                biased;

                _ = self.stop.cancelled() => break,

                sent = tx.send(task) => {
                    if sent.is_err() {
                        warn!("all workers exited early");
                        break;
                    }
                }
            }
        }

        self.state.send_replace(UpdaterState::Draining);
        drop(tx);

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(stats) => report.absorb(stats),
                Err(e) => error!(error = %e, "update worker panicked"),
            }
        }

        report.cancelled = self.stop.is_cancelled();
        info!(
            dispatched = report.dispatched,
            replaced = report.replaced,
            failed = report.failed,
            interrupted = report.interrupted,
            cancelled = report.cancelled,
            "update finished"
        );
        report
    }
}

/// Moves the state machine to `Done` however `run` exits.
struct DoneGuard<'a>(&'a watch::Sender<UpdaterState>);

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(UpdaterState::Done);
    }
}

// =============================================================================
// Worker
// =============================================================================

struct Worker {
    slot: usize,
    store: Arc<dyn Store>,
    watch_queue: WatchQueue,
    stop: CancellationToken,
    service: Arc<Service>,
    queue: Arc<Mutex<mpsc::Receiver<Task>>>,
    delay: Duration,
}

impl Worker {
    async fn run(self) -> WorkerStats {
        let mut stats = WorkerStats::default();

        loop {
            let next = tokio::select! {
                biased;

                _ = self.stop.cancelled() => None,

                task = async { self.queue.lock().await.recv().await } => task,
            };
            let Some(original) = next else {
                break;
            };
            stats.dispatched += 1;

            let updated = replacement_for(&self.service, &original);
            let result = replace_task(
                self.store.as_ref(),
                &self.watch_queue,
                &self.stop,
                &original,
                updated,
            )
            .await;

            match result {
                Ok(ReplaceOutcome::Running) => stats.replaced += 1,
                Ok(ReplaceOutcome::Cancelled) => stats.interrupted += 1,
                Err(e) => {
                    error!(task.id = %original.id, error = %e, "update failed");
                    stats.failed += 1;
                }
            }

            if !self.delay.is_zero() {
                tokio::select! {
                    biased;

                    _ = self.stop.cancelled() => break,

                    _ = tokio::time::sleep(self.delay) => {}
                }
            }
        }

        debug!(slot = self.slot, replaced = stats.replaced, "worker exiting");
        stats
    }
}
