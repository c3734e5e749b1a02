//! Store and transaction traits.

use rollout_events::WatchQueue;
use rollout_id::TaskId;
use rollout_model::Task;

use crate::StoreError;

/// Transaction-scoped view of the store.
///
/// Writes are staged; they become visible to other readers only if the
/// enclosing [`Store::update`] closure returns `Ok`.
pub trait Tx {
    fn get_task(&self, id: &TaskId) -> Option<Task>;

    /// Overwrites an existing task.
    fn update_task(&mut self, task: Task) -> Result<(), StoreError>;

    /// Inserts a task whose id must not exist yet.
    fn create_task(&mut self, task: Task) -> Result<(), StoreError>;

    fn delete_task(&mut self, id: &TaskId) -> Result<(), StoreError>;
}

/// A transactional task store with an associated watch queue.
pub trait Store: Send + Sync {
    /// Runs `f` against a fresh transaction and commits it if `f` succeeds.
    ///
    /// Either every write made by `f` is applied or none is.
    fn update(
        &self,
        f: &mut dyn FnMut(&mut dyn Tx) -> Result<(), StoreError>,
    ) -> Result<(), StoreError>;

    /// Queue on which committed changes are published.
    fn watch_queue(&self) -> WatchQueue;
}
