//! Event definitions.

use rollout_model::Task;
use serde::{Deserialize, Serialize};

/// Kind of change an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CreateTask,
    UpdateTask,
    DeleteTask,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateTask => "task.created",
            Self::UpdateTask => "task.updated",
            Self::DeleteTask => "task.deleted",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed change to a task, carrying the task as it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "task", rename_all = "snake_case")]
pub enum Event {
    CreateTask(Task),
    UpdateTask(Task),
    DeleteTask(Task),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::CreateTask(_) => EventKind::CreateTask,
            Event::UpdateTask(_) => EventKind::UpdateTask,
            Event::DeleteTask(_) => EventKind::DeleteTask,
        }
    }

    pub fn task(&self) -> &Task {
        match self {
            Event::CreateTask(t) | Event::UpdateTask(t) | Event::DeleteTask(t) => t,
        }
    }

    pub fn into_task(self) -> Task {
        match self {
            Event::CreateTask(t) | Event::UpdateTask(t) | Event::DeleteTask(t) => t,
        }
    }
}
