//! In-memory task store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rollout_events::{Event, WatchQueue};
use rollout_id::{ServiceId, TaskId};
use rollout_model::Task;
use tracing::{debug, trace};

use crate::{Store, StoreError, Tx};

/// Map-backed [`Store`].
///
/// Transactions are serialized by one lock. Events for a commit are
/// published while that lock is still held, so subscribers observe changes
/// in commit order.
#[derive(Default)]
pub struct MemoryStore {
    tasks: Mutex<BTreeMap<TaskId, Task>>,
    queue: WatchQueue,
    transactions: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts out holding `tasks`. Seeding is not a
    /// transaction and publishes no events.
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let store = Self::new();
        store
            .lock()
            .extend(tasks.into_iter().map(|t| (t.id, t)));
        store
    }

    pub fn get_task(&self, id: &TaskId) -> Option<Task> {
        self.lock().get(id).cloned()
    }

    pub fn list_tasks(&self) -> Vec<Task> {
        self.lock().values().cloned().collect()
    }

    /// Tasks of one service, ordered by instance.
    pub fn tasks_by_service(&self, service_id: &ServiceId) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .lock()
            .values()
            .filter(|t| t.service_id == *service_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.instance);
        tasks
    }

    /// Number of committed transactions.
    pub fn transactions(&self) -> u64 {
        self.transactions.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<TaskId, Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn update(
        &self,
        f: &mut dyn FnMut(&mut dyn Tx) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let mut tasks = self.lock();

        let mut tx = MemoryTx {
            committed: &tasks,
            staged: BTreeMap::new(),
            events: Vec::new(),
        };
        if let Err(e) = f(&mut tx) {
            debug!(error = %e, "transaction rejected");
            return Err(e);
        }

        let MemoryTx { staged, events, .. } = tx;
        for (id, change) in staged {
            match change {
                Some(task) => tasks.insert(id, task),
                None => tasks.remove(&id),
            };
        }
        let seq = self.transactions.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(seq, events = events.len(), "transaction committed");

        for event in events {
            self.queue.publish(event);
        }
        Ok(())
    }

    fn watch_queue(&self) -> WatchQueue {
        self.queue.clone()
    }
}

struct MemoryTx<'a> {
    committed: &'a BTreeMap<TaskId, Task>,
    /// `None` marks a deletion.
    staged: BTreeMap<TaskId, Option<Task>>,
    events: Vec<Event>,
}

impl Tx for MemoryTx<'_> {
    fn get_task(&self, id: &TaskId) -> Option<Task> {
        match self.staged.get(id) {
            Some(change) => change.clone(),
            None => self.committed.get(id).cloned(),
        }
    }

    fn update_task(&mut self, task: Task) -> Result<(), StoreError> {
        if self.get_task(&task.id).is_none() {
            return Err(StoreError::NotFound(task.id));
        }
        self.events.push(Event::UpdateTask(task.clone()));
        self.staged.insert(task.id, Some(task));
        Ok(())
    }

    fn create_task(&mut self, task: Task) -> Result<(), StoreError> {
        if self.get_task(&task.id).is_some() {
            return Err(StoreError::AlreadyExists(task.id));
        }
        self.events.push(Event::CreateTask(task.clone()));
        self.staged.insert(task.id, Some(task));
        Ok(())
    }

    fn delete_task(&mut self, id: &TaskId) -> Result<(), StoreError> {
        let task = self.get_task(id).ok_or(StoreError::NotFound(*id))?;
        self.events.push(Event::DeleteTask(task));
        self.staged.insert(*id, None);
        Ok(())
    }
}
