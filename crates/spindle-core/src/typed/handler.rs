//! Handlers - re-check one kind of external job.
//!
//! Two layers:
//! - `PendingHandler<T>`: typed, receives the decoded payload.
//! - `DynPendingHandler`: object-safe, receives the raw row; this is what the
//!   registry stores and the poller calls.
//!
//! `TypedPendingHandler<T, H>` erases the first into the second.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::codec::PayloadCodec;
use super::task::PendingPayload;
use crate::domain::{PendingTask, PendingTaskUpdate, SpindleError};

/// Per-tick information handed to every handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollContext {
    /// Clock reading taken once at the start of the tick.
    pub now: DateTime<Utc>,
}

/// Checks one external job and reports what to do with its row.
///
/// Return values:
/// - still running: `PendingTaskUpdate::rearm(task, ctx.now, delay)`
/// - done: finalize first (upload assets, update the originating record,
///   settle quota), then `PendingTaskUpdate::success(task)`
/// - failed: push the failure into the domain record, then return `Err`
///
/// Finalization is not retried by the engine, and a row may be revisited if
/// the status write fails after finalization, so finalizers must be
/// idempotent.
///
/// # Example
/// ```ignore
/// struct ImageJobHandler { vendor: VendorClient }
///
/// #[async_trait]
/// impl PendingHandler<ImageJob> for ImageJobHandler {
///     async fn check(&self, task: &PendingTask, job: ImageJob, ctx: &PollContext)
///         -> Result<PendingTaskUpdate, SpindleError>
///     {
///         match self.vendor.status(&job.vendor_job_id).await? {
///             VendorStatus::Running => Ok(PendingTaskUpdate::rearm(task, ctx.now, REARM)),
///             VendorStatus::Done(url) => { /* finalize */ Ok(PendingTaskUpdate::success(task)) }
///             VendorStatus::Failed(why) => Err(SpindleError::handler(why)),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait PendingHandler<T: PendingPayload>: Send + Sync {
    async fn check(
        &self,
        task: &PendingTask,
        payload: T,
        ctx: &PollContext,
    ) -> Result<PendingTaskUpdate, SpindleError>;
}

/// One handler instance shared by several payload types, or kept by the
/// caller after registration.
#[async_trait]
impl<T: PendingPayload, H: PendingHandler<T>> PendingHandler<T> for Arc<H> {
    async fn check(
        &self,
        task: &PendingTask,
        payload: T,
        ctx: &PollContext,
    ) -> Result<PendingTaskUpdate, SpindleError> {
        (**self).check(task, payload, ctx).await
    }
}

/// Object-safe handler stored in the registry.
#[async_trait]
pub trait DynPendingHandler: Send + Sync {
    async fn check_dyn(
        &self,
        task: &PendingTask,
        ctx: &PollContext,
    ) -> Result<PendingTaskUpdate, SpindleError>;
}

pub struct TypedPendingHandler<T: PendingPayload, H: PendingHandler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PendingPayload, H: PendingHandler<T>> TypedPendingHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: PendingPayload, H: PendingHandler<T>> DynPendingHandler for TypedPendingHandler<T, H> {
    async fn check_dyn(
        &self,
        task: &PendingTask,
        ctx: &PollContext,
    ) -> Result<PendingTaskUpdate, SpindleError> {
        let payload: T = PayloadCodec::decode(task)?;
        self.handler.check(task, payload, ctx).await
    }
}
