//! # rollout-events
//!
//! Change events emitted by the task store, and the watch queue that
//! delivers them.
//!
//! ## Semantics
//!
//! - One event per committed change, published after the commit
//! - Each subscription gets its own ordered, unbounded channel
//! - Filtering happens at publish time, so a subscriber never sees
//!   events it did not ask for
//! - Only events published after `watch` returns are delivered; subscribe
//!   before issuing the write you want to observe

mod filter;
mod queue;
mod types;

pub use filter::{EventFilter, TaskCheck};
pub use queue::{Subscription, WatchQueue};
pub use types::{Event, EventKind};
