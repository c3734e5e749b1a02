//! Rolling-update engine.
//!
//! Replaces the stale tasks of a service with tasks built from its current
//! spec, a bounded number at a time:
//!
//! - [`UpdateSupervisor`] keeps at most one update per service, cancelling
//!   the previous one when a new spec arrives
//! - [`Updater`] runs one update: diff, dispatch to workers, drain
//! - [`replace_task`] swaps one task for its successor and waits for the
//!   successor to come up
//!
//! # Invariants
//!
//! - Clean tasks are never touched
//! - No more than `parallelism` replacements are in flight per update
//! - Cancellation stops new work and unblocks every wait; it never rolls
//!   back a committed replacement
//! - A failed replacement is logged and skipped, never retried here

mod config;
mod diff;
mod error;
mod replace;
mod supervisor;
mod updater;

pub use config::UpdaterConfig;
pub use diff::{dirty_tasks, is_dirty};
pub use error::UpdateError;
pub use replace::{replace_task, replacement_for, ReplaceOutcome};
pub use supervisor::UpdateSupervisor;
pub use updater::{UpdateReport, Updater, UpdaterState};
