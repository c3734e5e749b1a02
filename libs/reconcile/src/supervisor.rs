//! Per-service update supervision.
//!
//! The supervisor owns a registry of in-flight updates keyed by service.
//! Starting an update for a service that already has one cancels the old
//! one and waits for it to stop before the new one is registered, so two
//! updates for the same service never write concurrently.
//!
//! ```text
//! update(svc, tasks)
//!   lock registry
//!   ├─► registry[svc] exists? → cancel() and wait for Done
//!   ├─► registry[svc] = new Updater
//!   └─► spawn: run → lock registry → remove entry if still ours
//! ```
//!
//! Waiting under the lock cannot deadlock: an updater reports `Done` before
//! its spawned task tries to take the lock to deregister.

use std::collections::HashMap;
use std::sync::Arc;

use rollout_id::ServiceId;
use rollout_model::{Service, Task};
use rollout_state::Store;
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, Instrument};

use crate::{Updater, UpdaterConfig};

type Registry = Arc<Mutex<HashMap<ServiceId, Arc<Updater>>>>;

/// Keeps at most one running update per service.
pub struct UpdateSupervisor {
    store: Arc<dyn Store>,
    config: UpdaterConfig,
    updates: Registry,
}

impl UpdateSupervisor {
    pub fn new(store: Arc<dyn Store>, config: UpdaterConfig) -> Self {
        Self {
            store,
            config,
            updates: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts updating `tasks` of `service` in the background.
    ///
    /// If an update for the service is already running it is cancelled, and
    /// this call waits for it to stop. Returns once the new update has been
    /// spawned.
    pub async fn update(&self, service: Service, tasks: Vec<Task>) {
        let mut updates = self.updates.lock().await;
        let id = service.id;

        if let Some(previous) = updates.get(&id) {
            info!(service.id = %id, "cancelling superseded update");
            previous.cancel().await;
        }

        let updater = Arc::new(Updater::new(Arc::clone(&self.store), self.config.clone()));
        updates.insert(id, Arc::clone(&updater));

        let registry = Arc::clone(&self.updates);
        let span = info_span!("update", service.id = %id);
        tokio::spawn(
            async move {
                updater.run(&service, &tasks).await;

                let mut updates = registry.lock().await;
                if updates
                    .get(&id)
                    .is_some_and(|current| Arc::ptr_eq(current, &updater))
                {
                    updates.remove(&id);
                    debug!("update deregistered");
                }
            }
            .instrument(span),
        );
    }

    /// Signals every running update to stop. Does not wait for them.
    pub async fn cancel_all(&self) {
        let updates = self.updates.lock().await;
        info!(count = updates.len(), "cancelling all updates");
        for updater in updates.values() {
            updater.stop();
        }
    }

    /// Cancels every running update and waits until all of them stopped.
    pub async fn shutdown(&self) {
        let drained: Vec<Arc<Updater>> = {
            let mut updates = self.updates.lock().await;
            updates.drain().map(|(_, u)| u).collect()
        };
        info!(count = drained.len(), "shutting down updates");

        for updater in &drained {
            updater.stop();
        }
        for updater in drained {
            updater.wait().await;
        }
    }

    /// Whether an update for `service_id` is registered.
    pub async fn is_updating(&self, service_id: &ServiceId) -> bool {
        self.updates.lock().await.contains_key(service_id)
    }

    /// Services with a registered update.
    pub async fn active_updates(&self) -> Vec<ServiceId> {
        let mut ids: Vec<ServiceId> = self.updates.lock().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
