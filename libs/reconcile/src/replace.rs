//! Single task replacement.
//!
//! The successor is watched *before* the retire-and-create transaction is
//! issued. Watching afterwards would race with the successor's first status
//! updates: an event published between the commit and the subscription is
//! never delivered, and the wait below would block forever.

use rollout_events::{EventFilter, WatchQueue};
use rollout_model::{Service, Task, TaskState};
use rollout_state::{Store, StoreError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::UpdateError;

/// How a replacement that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The successor reported running (or a later state).
    Running,
    /// The update was cancelled first. If that happened after the commit,
    /// the successor exists and may still come up.
    Cancelled,
}

/// Builds the successor for `original`: same instance slot, the service's
/// current spec, and for fill-mode services the same node.
pub fn replacement_for(service: &Service, original: &Task) -> Task {
    let mut updated = Task::new_for_service(service, original.instance);
    if service.is_fill() {
        updated.node_id = original.node_id;
    }
    updated
}

/// Retires `original` and creates `updated` in one transaction, then waits
/// until `updated` is running or `stop` is cancelled.
///
/// There is no timeout: a successor that never starts holds the caller
/// until `stop` fires.
pub async fn replace_task(
    store: &dyn Store,
    queue: &WatchQueue,
    stop: &CancellationToken,
    original: &Task,
    updated: Task,
) -> Result<ReplaceOutcome, UpdateError> {
    let updated_id = updated.id;
    debug!(task.id = %original.id, replacement.id = %updated_id, "replacing task");

    let mut updates = queue.watch([EventFilter::task_updated(updated_id)]);

    if stop.is_cancelled() {
        return Ok(ReplaceOutcome::Cancelled);
    }
    store.update(&mut |tx| {
        let mut retired = tx
            .get_task(&original.id)
            .ok_or(StoreError::NotFound(original.id))?;
        retired.desired_state = TaskState::Dead;
        tx.update_task(retired)?;
        tx.create_task(updated.clone())
    })?;

    let outcome = loop {
        tokio::select! {
            biased;

            _ = stop.cancelled() => break ReplaceOutcome::Cancelled,

            event = updates.recv() => {
                let Some(event) = event else {
                    return Err(UpdateError::WatchClosed(updated_id));
                };
                let state = event.task().status.state;
                trace!(replacement.id = %updated_id, state = %state, "replacement changed");
                if state.has_started() {
                    break ReplaceOutcome::Running;
                }
            }
        }
    };

    updates.cancel();
    debug!(replacement.id = %updated_id, outcome = ?outcome, "replacement finished");
    Ok(outcome)
}
