//! PendingTaskPoller - one pass over the due pending tasks.
//!
//! 1. list the due rows (the only failure that aborts the pass)
//! 2. check every row concurrently, each in its own task
//! 3. persist the resulting transition per row
//!
//! A row never affects another row: handler errors, panics, unknown types
//! and failed writes are all contained, logged, and counted in the
//! `TickReport`.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::task::JoinSet;

use crate::domain::pending::chrono_delay;
use crate::domain::{PendingTask, PendingTaskStatus, PendingTaskUpdate, SpindleError};
use crate::observability::TickReport;
use crate::ports::{Clock, PendingTaskStore};
use crate::typed::{HandlerRegistry, PollContext};

use super::scheduler::TickJob;

/// What happened to one row during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Rearmed,
    Succeeded,
    Failed,
    TimedOut,
    PersistFailed,
}

pub struct PendingTaskPoller {
    store: Arc<dyn PendingTaskStore>,
    registry: Arc<HandlerRegistry>,
    clock: Arc<dyn Clock>,
    fallback_rearm_delay: Duration,
}

impl PendingTaskPoller {
    pub fn new(
        store: Arc<dyn PendingTaskStore>,
        registry: Arc<HandlerRegistry>,
        clock: Arc<dyn Clock>,
        fallback_rearm_delay: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
            fallback_rearm_delay,
        }
    }

    /// Run one pass. Callers are expected to hold the poll lock.
    pub async fn run(&self) -> Result<TickReport, SpindleError> {
        let started = Instant::now();
        let ctx = PollContext {
            now: self.clock.now(),
        };

        let due = self.store.list_due(ctx.now).await.map_err(|e| {
            tracing::error!(error = %e, "failed to list due pending tasks");
            e
        })?;

        let mut report = TickReport {
            due: due.len(),
            ..Default::default()
        };

        let mut rows = JoinSet::new();
        for row in due {
            let store = Arc::clone(&self.store);
            let registry = Arc::clone(&self.registry);
            let fallback = self.fallback_rearm_delay;
            rows.spawn(process_row(store, registry, row, ctx, fallback));
        }

        while let Some(joined) = rows.join_next().await {
            match joined {
                Ok(RowOutcome::Rearmed) => report.rearmed += 1,
                Ok(RowOutcome::Succeeded) => report.succeeded += 1,
                Ok(RowOutcome::Failed) => report.failed += 1,
                Ok(RowOutcome::TimedOut) => report.timed_out += 1,
                Ok(RowOutcome::PersistFailed) => report.persist_failed += 1,
                Err(e) => {
                    // handler panics are caught inside process_row, so this is
                    // the poller's own bookkeeping failing
                    tracing::error!(error = %e, "pending task worker ended abnormally");
                    report.persist_failed += 1;
                }
            }
        }

        report.elapsed = started.elapsed();
        if report.is_idle() {
            tracing::debug!(elapsed_ms = report.elapsed.as_millis() as u64, "no pending tasks due");
        } else {
            tracing::info!(
                due = report.due,
                rearmed = report.rearmed,
                succeeded = report.succeeded,
                failed = report.failed,
                timed_out = report.timed_out,
                persist_failed = report.persist_failed,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "pending task poll finished"
            );
        }
        Ok(report)
    }
}

#[async_trait]
impl TickJob for PendingTaskPoller {
    fn name(&self) -> &str {
        "pending_task_poller"
    }

    async fn tick(&self) -> Result<(), SpindleError> {
        self.run().await.map(|_| ())
    }
}

async fn process_row(
    store: Arc<dyn PendingTaskStore>,
    registry: Arc<HandlerRegistry>,
    row: PendingTask,
    ctx: PollContext,
    fallback_rearm_delay: Duration,
) -> RowOutcome {
    let update = decide(&registry, &row, ctx, fallback_rearm_delay).await;
    let outcome = match update.status {
        PendingTaskStatus::Processing => RowOutcome::Rearmed,
        PendingTaskStatus::Success => RowOutcome::Succeeded,
        PendingTaskStatus::Failed => RowOutcome::Failed,
        PendingTaskStatus::Timeout => RowOutcome::TimedOut,
    };

    match store.update(row.id, update).await {
        Ok(()) => outcome,
        Err(e) => {
            tracing::error!(
                pending_task_id = %row.id,
                task_id = %row.task_id,
                task_type = %row.task_type,
                error = %e,
                "failed to persist pending task transition"
            );
            RowOutcome::PersistFailed
        }
    }
}

/// The transition for one row. Never fails: every error becomes `Failed`.
async fn decide(
    registry: &HandlerRegistry,
    row: &PendingTask,
    ctx: PollContext,
    fallback_rearm_delay: Duration,
) -> PendingTaskUpdate {
    if row.is_deadline_exceeded(ctx.now) {
        tracing::warn!(
            pending_task_id = %row.id,
            task_id = %row.task_id,
            task_type = %row.task_type,
            execute_times = row.execute_times,
            "pending task deadline exceeded"
        );
        return PendingTaskUpdate::timeout(row);
    }

    let Some(handler) = registry.get(&row.task_type) else {
        let err = SpindleError::HandlerNotFound(row.task_type.clone());
        tracing::error!(
            pending_task_id = %row.id,
            task_id = %row.task_id,
            task_type = %row.task_type,
            "no handler registered for pending task"
        );
        // no attempt was made, so the counter stays
        return PendingTaskUpdate {
            execute_times: row.execute_times,
            ..PendingTaskUpdate::failed(row, err.to_string())
        };
    };

    let owned = row.clone();
    let joined = tokio::spawn(async move { handler.check_dyn(&owned, &ctx).await }).await;

    let result = match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(SpindleError::HandlerPanicked(panic_message(e.into_panic()))),
        Err(e) => Err(SpindleError::HandlerPanicked(e.to_string())),
    };

    match result {
        Ok(mut update) => {
            // the counter belongs to the engine: one per handler invocation
            update.execute_times = row.execute_times + 1;
            if update.status == PendingTaskStatus::Processing && update.next_execute_at.is_none() {
                update.next_execute_at = Some(ctx.now + chrono_delay(fallback_rearm_delay));
            }
            tracing::debug!(
                pending_task_id = %row.id,
                task_type = %row.task_type,
                status = ?update.status,
                execute_times = update.execute_times,
                "pending task checked"
            );
            update
        }
        Err(e) => {
            tracing::warn!(
                pending_task_id = %row.id,
                task_id = %row.task_id,
                task_type = %row.task_type,
                execute_times = row.execute_times + 1,
                error = %e,
                "pending task handler failed"
            );
            PendingTaskUpdate::failed(row, e.to_string())
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
