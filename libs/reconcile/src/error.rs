use rollout_id::TaskId;
use rollout_state::StoreError;
use thiserror::Error;

/// Errors from replacing a single task.
///
/// Cancellation is not an error; see [`crate::ReplaceOutcome`].
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The store refused the retire-and-create transaction.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The store's watch queue was closed before the successor reported
    /// running.
    #[error("watch closed while waiting for task {0}")]
    WatchClosed(TaskId),
}
