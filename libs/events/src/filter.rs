//! Subscription filters.

use rollout_id::{NodeId, ServiceId, TaskId};

use crate::{Event, EventKind};

/// A predicate over the task carried by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCheck {
    Id(TaskId),
    ServiceId(ServiceId),
    NodeId(NodeId),
}

impl TaskCheck {
    fn matches(&self, event: &Event) -> bool {
        let task = event.task();
        match self {
            TaskCheck::Id(id) => task.id == *id,
            TaskCheck::ServiceId(id) => task.service_id == *id,
            TaskCheck::NodeId(id) => task.node_id == Some(*id),
        }
    }
}

/// Selects events of one kind whose task passes every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    pub kind: EventKind,
    pub checks: Vec<TaskCheck>,
}

impl EventFilter {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            checks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_check(mut self, check: TaskCheck) -> Self {
        self.checks.push(check);
        self
    }

    /// Updates to one specific task.
    pub fn task_updated(id: TaskId) -> Self {
        Self::new(EventKind::UpdateTask).with_check(TaskCheck::Id(id))
    }

    pub fn matches(&self, event: &Event) -> bool {
        event.kind() == self.kind && self.checks.iter().all(|c| c.matches(event))
    }
}
