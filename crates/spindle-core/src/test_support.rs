//! Fixtures shared by the unit tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::domain::{
    NewPendingTask, PendingTask, PendingTaskId, PendingTaskUpdate, SpindleError, TaskType,
    WorkItemId,
};
use crate::typed::{PendingHandler, PendingPayload, PollContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoJob {
    pub vendor_job_id: String,
}

impl PendingPayload for VideoJob {
    const TYPE: &'static str = "test.video.generate.v1";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageJob {
    pub vendor_job_id: String,
    pub prompt: String,
}

impl PendingPayload for ImageJob {
    const TYPE: &'static str = "test.image.generate.v1";
}

/// A `Processing` row of type `T::TYPE`, due at `next_execute_at`.
pub fn pending_row<T: PendingPayload>(
    payload: serde_json::Value,
    next_execute_at: DateTime<Utc>,
    deadline_at: Option<DateTime<Utc>>,
) -> PendingTask {
    PendingTask::new(
        PendingTaskId::from_ulid(Ulid::new()),
        NewPendingTask {
            task_id: WorkItemId::from_ulid(Ulid::new()),
            task_type: TaskType::new(T::TYPE),
            payload,
            next_execute_at,
            deadline_at,
        },
        next_execute_at,
    )
}

/// Vendor job is done on the first check.
pub struct SucceedHandler;

#[async_trait]
impl<T: PendingPayload> PendingHandler<T> for SucceedHandler {
    async fn check(
        &self,
        task: &PendingTask,
        _payload: T,
        _ctx: &PollContext,
    ) -> Result<PendingTaskUpdate, SpindleError> {
        Ok(PendingTaskUpdate::success(task))
    }
}

/// Vendor job never finishes; counts how often it was asked.
pub struct StillRunningHandler {
    pub delay: Duration,
    pub calls: AtomicU32,
}

impl StillRunningHandler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: PendingPayload> PendingHandler<T> for StillRunningHandler {
    async fn check(
        &self,
        task: &PendingTask,
        _payload: T,
        ctx: &PollContext,
    ) -> Result<PendingTaskUpdate, SpindleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PendingTaskUpdate::rearm(task, ctx.now, self.delay))
    }
}

pub struct FailHandler {
    reason: String,
}

impl FailHandler {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl<T: PendingPayload> PendingHandler<T> for FailHandler {
    async fn check(
        &self,
        _task: &PendingTask,
        _payload: T,
        _ctx: &PollContext,
    ) -> Result<PendingTaskUpdate, SpindleError> {
        Err(SpindleError::handler(self.reason.clone()))
    }
}

/// Panics when the payload's vendor id matches `poison`, succeeds otherwise.
pub struct PanicOnHandler {
    pub poison: String,
}

#[async_trait]
impl PendingHandler<VideoJob> for PanicOnHandler {
    async fn check(
        &self,
        task: &PendingTask,
        payload: VideoJob,
        _ctx: &PollContext,
    ) -> Result<PendingTaskUpdate, SpindleError> {
        if payload.vendor_job_id == self.poison {
            panic!("vendor client blew up on {}", payload.vendor_job_id);
        }
        Ok(PendingTaskUpdate::success(task))
    }
}
