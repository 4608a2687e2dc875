//! Work items handed to the broker, and the audit record kept for each.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::WorkItemId;
use super::task_type::TaskType;

/// A unit of work as callers describe it, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub task_type: TaskType,
    /// Human-readable label shown in audit views.
    pub title: String,
    /// Logical broker queue, e.g. `default` or `critical`.
    pub queue: String,
    pub payload: serde_json::Value,
}

impl WorkItem {
    pub fn new(task_type: impl Into<TaskType>, title: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            task_type: task_type.into(),
            title: title.into(),
            queue: DEFAULT_QUEUE.to_string(),
            payload,
        }
    }

    pub fn on_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }
}

pub const DEFAULT_QUEUE: &str = "default";

/// What the broker receives: the id travels with the work so the executing
/// worker can correlate pending tasks back to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkEnvelope {
    pub id: WorkItemId,
    pub task_type: TaskType,
    pub payload: serde_json::Value,
}

/// Persisted record of an enqueued work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub id: WorkItemId,
    pub task_type: TaskType,
    pub title: String,
    pub queue: String,
    /// Exact bytes handed to the broker.
    pub raw_payload: Vec<u8>,
    pub broker_id: String,
    pub enqueued_at: DateTime<Utc>,
}
