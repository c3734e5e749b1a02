//! Task definitions.

use chrono::{DateTime, Utc};
use rollout_id::{NodeId, ServiceId, TaskId};
use serde::{Deserialize, Serialize};

use crate::{ContainerSpec, Service};

/// Task lifecycle state.
///
/// Variants are declared in lifecycle order so that `>=` comparisons
/// answer "has the task got at least this far".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    New,
    Pending,
    Assigned,
    Accepted,
    Preparing,
    Ready,
    Starting,
    Running,
    Completed,
    Shutdown,
    Failed,
    Rejected,
    Dead,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Accepted => "accepted",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Shutdown => "shutdown",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
            Self::Dead => "dead",
        }
    }

    /// True once the task has reached `Running` or any later state.
    pub fn has_started(&self) -> bool {
        *self >= Self::Running
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last observed state of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    pub timestamp: DateTime<Utc>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: String::new(),
            timestamp: Utc::now(),
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::new(TaskState::New)
    }
}

/// One instance of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub service_id: ServiceId,

    /// Replica slot this task fills. A replacement keeps the slot.
    pub instance: u64,

    /// Node the task is pinned to. Only set up front for fill-mode services.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,

    /// Container the task was created with; empty if it never had one.
    #[serde(default)]
    pub spec: ContainerSpec,

    pub desired_state: TaskState,

    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    /// A fresh task for `instance` of `service`, carrying the service's
    /// current container spec and wanting to run.
    pub fn new_for_service(service: &Service, instance: u64) -> Self {
        Self {
            id: TaskId::new(),
            service_id: service.id,
            instance,
            node_id: None,
            spec: service.spec.container.clone().unwrap_or_default(),
            desired_state: TaskState::Running,
            status: TaskStatus::default(),
        }
    }

    /// Returns a copy with the observed state moved to `state`.
    pub fn with_state(mut self, state: TaskState) -> Self {
        self.status = TaskStatus::new(state);
        self
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::ServiceSpec;

    #[rstest]
    #[case(TaskState::New, false)]
    #[case(TaskState::Assigned, false)]
    #[case(TaskState::Starting, false)]
    #[case(TaskState::Running, true)]
    #[case(TaskState::Failed, true)]
    #[case(TaskState::Dead, true)]
    fn test_has_started(#[case] state: TaskState, #[case] expected: bool) {
        assert_eq!(state.has_started(), expected);
    }

    #[test]
    fn test_state_order() {
        assert!(TaskState::New < TaskState::Pending);
        assert!(TaskState::Pending < TaskState::Assigned);
        assert!(TaskState::Ready < TaskState::Starting);
        assert!(TaskState::Starting < TaskState::Running);
    }

    #[test]
    fn test_new_for_service() {
        let service = Service::new(ServiceSpec {
            name: "web".into(),
            container: Some(ContainerSpec::image("nginx:1.27")),
            ..ServiceSpec::default()
        });

        let task = Task::new_for_service(&service, 3);
        assert_eq!(task.service_id, service.id);
        assert_eq!(task.instance, 3);
        assert_eq!(task.spec.image, "nginx:1.27");
        assert_eq!(task.desired_state, TaskState::Running);
        assert_eq!(task.status.state, TaskState::New);
        assert!(task.node_id.is_none());
    }

    #[test]
    fn test_new_for_service_without_container() {
        let service = Service::new(ServiceSpec::default());
        assert!(Task::new_for_service(&service, 0).spec.is_empty());
    }

    #[test]
    fn test_state_json() {
        assert_eq!(
            serde_json::to_string(&TaskState::Running).unwrap(),
            "\"running\""
        );
    }
}
