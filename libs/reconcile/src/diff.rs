//! Stale task detection.

use rollout_model::{Service, Task};

/// Whether `task` must be replaced to match `service`.
///
/// A service with a container spec wants every task to carry exactly that
/// spec. A service without one wants tasks without one; a task that still
/// carries a container is stale.
pub fn is_dirty(service: &Service, task: &Task) -> bool {
    match &service.spec.container {
        Some(desired) => *desired != task.spec,
        None => !task.spec.is_empty(),
    }
}

/// The stale subset of `tasks`, in their original order.
pub fn dirty_tasks<'a>(service: &Service, tasks: impl IntoIterator<Item = &'a Task>) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|t| is_dirty(service, t))
        .cloned()
        .collect()
}
