//! Test support for the update engine.
//!
//! - [`fixtures`]: services and tasks with sensible defaults
//! - [`SimulatedAgent`]: brings created tasks up to `Running`
//! - [`InstantStartStore`]: starts created tasks inside the creating commit
//! - [`wait_until`], [`set_state`], [`init_tracing`]

pub mod fixtures;

mod agent;
mod instant;

use std::time::{Duration, Instant};

use rollout_id::TaskId;
use rollout_model::{TaskState, TaskStatus};
use rollout_state::{Store, StoreError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use agent::SimulatedAgent;
pub use instant::InstantStartStore;

/// Sets the observed state of a stored task in its own transaction.
pub fn set_state<S: Store + ?Sized>(store: &S, id: TaskId, state: TaskState) -> Result<(), StoreError> {
    store.update(&mut |tx| {
        let mut task = tx.get_task(&id).ok_or(StoreError::NotFound(id))?;
        task.status = TaskStatus::new(state);
        tx.update_task(task)
    })
}

/// Polls `condition` every few milliseconds.
///
/// # Panics
///
/// Panics if `condition` is still false after `timeout`.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within {timeout:?}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Installs a JSON subscriber writing through the test harness.
///
/// Filtered by `RUST_LOG`, `warn` by default. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().json().with_test_writer())
        .try_init();
}
