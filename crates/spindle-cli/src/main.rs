use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spindle_core::app::SchedulerGroup;
use spindle_core::domain::{
    PendingTask, PendingTaskUpdate, SpindleError, WorkEnvelope, WorkItem, DEFAULT_QUEUE,
};
use spindle_core::impls::{
    InMemoryBroker, InMemoryLockStore, InMemoryPendingTaskStore, InMemoryWorkRecordStore,
};
use spindle_core::ports::{Clock, PendingTaskStore, SystemClock, UlidGenerator};
use spindle_core::typed::{PendingHandler, PendingPayload, PollContext};
use spindle_core::{AppBuilder, AppPorts, SpindleConfig};

/// A render job started at an imaginary vendor.
#[derive(Debug, Serialize, Deserialize)]
struct RenderJob {
    vendor_job_id: String,
    /// How many status checks the vendor needs before it reports done.
    checks_needed: u32,
}

impl PendingPayload for RenderJob {
    const TYPE: &'static str = "demo.render.v1";
}

struct RenderJobHandler {
    recheck_after: Duration,
}

#[async_trait]
impl PendingHandler<RenderJob> for RenderJobHandler {
    async fn check(
        &self,
        task: &PendingTask,
        job: RenderJob,
        ctx: &PollContext,
    ) -> Result<PendingTaskUpdate, SpindleError> {
        let attempt = task.execute_times + 1;
        if attempt < job.checks_needed {
            tracing::info!(vendor_job_id = %job.vendor_job_id, attempt, "vendor still rendering");
            return Ok(PendingTaskUpdate::rearm(task, ctx.now, self.recheck_after));
        }
        tracing::info!(vendor_job_id = %job.vendor_job_id, attempt, "vendor render finished");
        Ok(PendingTaskUpdate::success(task))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spindle=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SpindleConfig::from_env()?;
    tracing::info!(
        poll_interval_secs = config.poll_interval.as_secs(),
        lock_ttl_secs = config.lock_ttl.as_secs(),
        lock = %config.poll_lock_name,
        "loaded spindle configuration"
    );

    // (A) in-memory ports
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let pending = Arc::new(InMemoryPendingTaskStore::new(Arc::clone(&clock)));
    let broker = Arc::new(InMemoryBroker::new());
    let ports = AppPorts {
        locks: Arc::new(InMemoryLockStore::new(Arc::clone(&clock))),
        pending: pending.clone(),
        broker: broker.clone(),
        records: Arc::new(InMemoryWorkRecordStore::new()),
        ids: Arc::new(UlidGenerator::new(Arc::clone(&clock))),
        clock,
    };

    // (B) handlers, validated at startup
    let app = AppBuilder::new(ports, config.clone())
        .register_typed::<RenderJob, _>(RenderJobHandler {
            recheck_after: Duration::from_secs(1),
        })
        .expect_tasks(&[RenderJob::TYPE])
        .build()?;

    // (C) enqueue a work item
    let work_id = app
        .dispatcher
        .enqueue(WorkItem::new(
            RenderJob::TYPE,
            "render demo clip",
            serde_json::json!({ "clip": "intro" }),
        ))
        .await?;

    // (D) play the broker worker: start the vendor job and defer the rest
    let Some(message) = broker.pop(DEFAULT_QUEUE).await else {
        return Err("work item never reached the broker".into());
    };
    let envelope: WorkEnvelope = serde_json::from_slice(&message.body)?;
    let pending_id = app
        .deferrer
        .defer_typed(
            envelope.id,
            &RenderJob {
                vendor_job_id: format!("vendor-{}", envelope.id.as_ulid()),
                checks_needed: 3,
            },
            Duration::from_secs(1),
            None,
        )
        .await?;
    tracing::info!(task_id = %work_id, pending_task_id = %pending_id, "vendor job started, polling");

    // (E) poll under the distributed lock until the job settles
    let scheduler = SchedulerGroup::spawn(vec![app.poll_schedule()]);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(250)) => {}
        }

        let Some(row) = pending.get(pending_id).await? else {
            break;
        };
        if row.status.is_terminal() {
            tracing::info!(
                status = ?row.status,
                execute_times = row.execute_times,
                last_error = ?row.last_error,
                "pending task settled"
            );
            break;
        }
    }

    scheduler.shutdown_and_join().await;
    tracing::info!(counts = ?pending.counts_by_status().await, "done");
    Ok(())
}
