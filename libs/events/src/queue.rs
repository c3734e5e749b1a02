//! Watch queue for task change events.
//!
//! [`WatchQueue`] fans every published [`Event`] out to the subscriptions
//! whose filters accept it. Each subscription owns an unbounded channel, so
//! publishing never blocks and a slow subscriber never drops events.
//!
//! ```text
//! Store commit ──► WatchQueue::publish ──┬──► Subscription (filters A)
//!                                        ├──► Subscription (filters B)
//!                                        └──► ...
//! ```
//!
//! A subscription is released with [`Subscription::cancel`] or by dropping
//! it. Releasing twice is harmless. [`WatchQueue::close`] ends every
//! subscription at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::{Event, EventFilter};

struct Sink {
    filters: Vec<EventFilter>,
    tx: mpsc::UnboundedSender<Event>,
}

impl Sink {
    fn accepts(&self, event: &Event) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|f| f.matches(event))
    }
}

#[derive(Default)]
struct Inner {
    sinks: Mutex<HashMap<u64, Sink>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Inner {
    fn sinks(&self) -> MutexGuard<'_, HashMap<u64, Sink>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared handle to a watch queue. Clones publish to the same subscribers.
#[derive(Clone, Default)]
pub struct WatchQueue {
    inner: Arc<Inner>,
}

impl WatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a subscription.
    ///
    /// An event is delivered if it matches any of `filters`; an empty
    /// filter list receives everything.
    pub fn watch(&self, filters: impl IntoIterator<Item = EventFilter>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let filters: Vec<EventFilter> = filters.into_iter().collect();

        {
            let mut sinks = self.inner.sinks();
            // Checked under the lock so a concurrent close cannot miss it.
            if self.inner.closed.load(Ordering::SeqCst) {
                trace!(subscription = id, "watch on closed queue");
                drop(tx);
            } else {
                trace!(subscription = id, filters = filters.len(), "watch started");
                sinks.insert(id, Sink { filters, tx });
            }
        }

        Subscription {
            id,
            rx,
            queue: self.clone(),
            released: false,
        }
    }

    /// Delivers `event` to every matching subscription.
    pub fn publish(&self, event: Event) {
        let mut sinks = self.inner.sinks();
        sinks.retain(|_, sink| {
            if !sink.accepts(&event) {
                return !sink.tx.is_closed();
            }
            sink.tx.send(event.clone()).is_ok()
        });
    }

    /// Ends every subscription and refuses new ones.
    ///
    /// Subscribers still receive the events delivered before the close;
    /// after those, `recv` returns `None`.
    pub fn close(&self) {
        let mut sinks = self.inner.sinks();
        self.inner.closed.store(true, Ordering::SeqCst);
        debug!(subscribers = sinks.len(), "watch queue closed");
        sinks.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions.
    pub fn subscribers(&self) -> usize {
        self.inner.sinks().len()
    }

    fn release(&self, id: u64) {
        if self.inner.sinks().remove(&id).is_some() {
            trace!(subscription = id, "watch released");
        }
    }
}

impl std::fmt::Debug for WatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchQueue")
            .field("subscribers", &self.subscribers())
            .finish()
    }
}

/// A live, filtered view of the watch queue.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<Event>,
    queue: WatchQueue,
    released: bool,
}

impl Subscription {
    /// Waits for the next matching event.
    ///
    /// Returns `None` once the subscription has been cancelled and every
    /// event delivered before that has been read.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Returns the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Stops delivery. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.queue.release(self.id);
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use rollout_model::{Service, ServiceSpec, Task, TaskState};

    use super::*;
    use crate::{EventKind, TaskCheck};

    fn task() -> Task {
        Task::new_for_service(&Service::new(ServiceSpec::default()), 0)
    }

    #[tokio::test]
    async fn test_delivers_only_matching_events_in_order() {
        let queue = WatchQueue::new();
        let watched = task();
        let other = task();

        let mut sub = queue.watch([EventFilter::task_updated(watched.id)]);

        queue.publish(Event::CreateTask(watched.clone()));
        queue.publish(Event::UpdateTask(other.clone()));
        queue.publish(Event::UpdateTask(watched.clone().with_state(TaskState::Pending)));
        queue.publish(Event::UpdateTask(watched.clone().with_state(TaskState::Running)));

        let first = sub.recv().await.unwrap();
        assert_eq!(first.task().status.state, TaskState::Pending);
        let second = sub.recv().await.unwrap();
        assert_eq!(second.task().status.state, TaskState::Running);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_empty_filters_receive_everything() {
        let queue = WatchQueue::new();
        let mut sub = queue.watch([]);

        queue.publish(Event::CreateTask(task()));
        queue.publish(Event::DeleteTask(task()));

        assert_eq!(sub.recv().await.unwrap().kind(), EventKind::CreateTask);
        assert_eq!(sub.recv().await.unwrap().kind(), EventKind::DeleteTask);
    }

    #[test]
    fn test_events_before_watch_are_not_delivered() {
        let queue = WatchQueue::new();
        let t = task();

        queue.publish(Event::UpdateTask(t.clone()));
        let mut sub = queue.watch([EventFilter::task_updated(t.id)]);

        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let queue = WatchQueue::new();
        let mut sub = queue.watch([EventFilter::new(EventKind::CreateTask)]);
        assert_eq!(queue.subscribers(), 1);

        sub.cancel();
        sub.cancel();
        assert_eq!(queue.subscribers(), 0);

        queue.publish(Event::CreateTask(task()));
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_drop_releases_subscription() {
        let queue = WatchQueue::new();
        {
            let _sub = queue.watch([EventFilter::new(EventKind::UpdateTask)
                .with_check(TaskCheck::Id(task().id))]);
            assert_eq!(queue.subscribers(), 1);
        }
        assert_eq!(queue.subscribers(), 0);
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions_after_pending_events() {
        let queue = WatchQueue::new();
        let t = task();
        let mut sub = queue.watch([EventFilter::task_updated(t.id)]);

        queue.publish(Event::UpdateTask(t.clone()));
        queue.close();
        queue.publish(Event::UpdateTask(t));

        assert!(queue.is_closed());
        assert_eq!(queue.subscribers(), 0);
        assert!(sub.recv().await.is_some());
        assert!(sub.recv().await.is_none());

        let mut late = queue.watch([]);
        assert_eq!(queue.subscribers(), 0);
        assert!(late.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_recv_ends_after_cancel() {
        let queue = WatchQueue::new();
        let mut sub = queue.watch([]);
        sub.cancel();
        assert!(sub.recv().await.is_none());
    }
}
