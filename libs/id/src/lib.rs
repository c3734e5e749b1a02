//! # rollout-id
//!
//! Typed identifiers used by the rolling-update engine.
//!
//! Every identifier renders as `{prefix}_{ulid}`:
//!
//! - `svc_01HV4Z2WQXKJNM8GPQY6VBKC3D` for services
//! - `task_01HV4Z3MXNKPQR9HSTZ7WCLD4E` for tasks
//! - `node_01HV4Z4NYPLTRS0JTUA8XDME5F` for nodes
//!
//! The prefix keeps a task id from being passed where a service id is
//! expected, both at compile time and when parsing external input.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::{NodeId, ServiceId, TaskId};

#[doc(hidden)]
pub use types::parse_prefixed;

/// Re-exported so the macro can name it from downstream crates.
pub use ulid::Ulid;
