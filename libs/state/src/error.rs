use rollout_id::TaskId;
use thiserror::Error;

/// Reasons a transaction is rejected. A rejected transaction leaves no
/// trace in the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("task already exists: {0}")]
    AlreadyExists(TaskId),

    #[error("transaction rejected: {0}")]
    Rejected(String),
}
