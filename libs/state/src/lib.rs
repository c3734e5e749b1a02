//! Task store.
//!
//! This crate defines the transactional interface the update engine writes
//! through and ships an in-memory implementation of it:
//! - [`Store`] runs a closure against a [`Tx`] and commits it atomically
//! - [`MemoryStore`] keeps tasks in a map and publishes one event per
//!   committed change on its [`rollout_events::WatchQueue`]

mod error;
mod memory;
mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{Store, Tx};
