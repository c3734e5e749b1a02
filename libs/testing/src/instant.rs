//! Store wrapper that starts tasks in the same call that creates them.

use rollout_events::WatchQueue;
use rollout_id::TaskId;
use rollout_model::{Task, TaskState};
use rollout_state::{Store, StoreError, Tx};

use crate::set_state;

/// Wraps a store so that every created task reaches `Running` before
/// [`Store::update`] returns.
///
/// The running event is published before the writer gets control back,
/// which is the tightest possible race against a watch set up after the
/// write.
pub struct InstantStartStore<S> {
    inner: S,
}

impl<S: Store> InstantStartStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Store> Store for InstantStartStore<S> {
    fn update(
        &self,
        f: &mut dyn FnMut(&mut dyn Tx) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let mut created = Vec::new();
        self.inner.update(&mut |tx| {
            created.clear();
            let mut recording = RecordingTx {
                inner: tx,
                created: &mut created,
            };
            f(&mut recording)
        })?;

        for id in created {
            set_state(&self.inner, id, TaskState::Running)?;
        }
        Ok(())
    }

    fn watch_queue(&self) -> WatchQueue {
        self.inner.watch_queue()
    }
}

struct RecordingTx<'a> {
    inner: &'a mut dyn Tx,
    created: &'a mut Vec<TaskId>,
}

impl Tx for RecordingTx<'_> {
    fn get_task(&self, id: &TaskId) -> Option<Task> {
        self.inner.get_task(id)
    }

    fn update_task(&mut self, task: Task) -> Result<(), StoreError> {
        self.inner.update_task(task)
    }

    fn create_task(&mut self, task: Task) -> Result<(), StoreError> {
        let id = task.id;
        self.inner.create_task(task)?;
        self.created.push(id);
        Ok(())
    }

    fn delete_task(&mut self, id: &TaskId) -> Result<(), StoreError> {
        self.inner.delete_task(id)
    }
}
