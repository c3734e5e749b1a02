//! # rollout-model
//!
//! Value types for services and tasks.
//!
//! A [`Service`] carries the desired container spec and the update policy.
//! A [`Task`] is one running instance of a service. Both are plain
//! snapshots; the only way to change a stored task is a store transaction.

mod service;
mod task;

pub use service::{ContainerSpec, Service, ServiceMode, ServiceSpec, UpdateConfig};
pub use task::{Task, TaskState, TaskStatus};
