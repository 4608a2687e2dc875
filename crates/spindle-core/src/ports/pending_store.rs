//! PendingTaskStore port - the durable pending-task table.
//!
//! Backed by a relational store in production; rows survive restarts and are
//! never deleted by the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{PendingTask, PendingTaskId, PendingTaskUpdate, SpindleError};

#[async_trait]
pub trait PendingTaskStore: Send + Sync {
    async fn create(&self, task: PendingTask) -> Result<(), SpindleError>;

    /// Rows with `status = Processing` and `next_execute_at <= now`.
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<PendingTask>, SpindleError>;

    /// Persist a transition. Implementations reject updates to terminal rows
    /// with `SpindleError::InvalidTransition`.
    async fn update(&self, id: PendingTaskId, update: PendingTaskUpdate)
    -> Result<(), SpindleError>;

    async fn get(&self, id: PendingTaskId) -> Result<Option<PendingTask>, SpindleError>;
}
