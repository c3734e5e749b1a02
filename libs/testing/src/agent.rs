//! A stand-in for the scheduler and node agents.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rollout_events::{EventFilter, EventKind};
use rollout_model::TaskState;
use rollout_state::Store;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::set_state;

#[derive(Default)]
struct Counters {
    pending: AtomicUsize,
    peak_pending: AtomicUsize,
    started: AtomicUsize,
}

/// Moves every newly created task to `Running` after `startup`.
///
/// Tracks how many created tasks are waiting to start at once, which is the
/// number of replacements an update has in flight.
pub struct SimulatedAgent {
    counters: Arc<Counters>,
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl SimulatedAgent {
    pub fn spawn<S: Store + ?Sized + 'static>(store: Arc<S>, startup: Duration) -> Self {
        let counters = Arc::new(Counters::default());
        let stop = CancellationToken::new();
        let mut created = store.watch_queue().watch([EventFilter::new(EventKind::CreateTask)]);

        let handle = tokio::spawn({
            let counters = Arc::clone(&counters);
            let stop = stop.clone();
            async move {
                loop {
                    let event = tokio::select! {
                        _ = stop.cancelled() => break,
                        event = created.recv() => event,
                    };
                    let Some(event) = event else { break };
                    let task = event.into_task();
                    if task.desired_state != TaskState::Running {
                        continue;
                    }

                    let pending = counters.pending.fetch_add(1, Ordering::SeqCst) + 1;
                    counters.peak_pending.fetch_max(pending, Ordering::SeqCst);

                    let store = Arc::clone(&store);
                    let counters = Arc::clone(&counters);
                    tokio::spawn(async move {
                        tokio::time::sleep(startup).await;
                        counters.pending.fetch_sub(1, Ordering::SeqCst);
                        match set_state(store.as_ref(), task.id, TaskState::Running) {
                            Ok(()) => {
                                counters.started.fetch_add(1, Ordering::SeqCst);
                                debug!(task.id = %task.id, "task started");
                            }
                            Err(e) => warn!(task.id = %task.id, error = %e, "could not start task"),
                        }
                    });
                }
            }
        });

        Self {
            counters,
            stop,
            handle,
        }
    }

    /// Tasks moved to `Running` so far.
    pub fn started(&self) -> usize {
        self.counters.started.load(Ordering::SeqCst)
    }

    /// Highest number of created tasks that were waiting to start at once.
    pub fn peak_pending(&self) -> usize {
        self.counters.peak_pending.load(Ordering::SeqCst)
    }

    pub async fn shutdown(self) {
        self.stop.cancel();
        let _ = self.handle.await;
    }
}
