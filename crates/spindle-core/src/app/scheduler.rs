//! 排他的な定期ジョブ
//!
//! 全インスタンスが同じ schedule を回し、各 tick で実際に仕事をするのは
//! lock を取れた 1 台だけ。
//!
//! # leadership は sticky
//! - 勝者は tick ごとに lock を更新し、手放さない
//! - 手放すのは shutdown 時のみ

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::domain::SpindleError;
use crate::lock::LockManager;

/// 定期実行される仕事の単位
#[async_trait]
pub trait TickJob: Send + Sync {
    fn name(&self) -> &str;

    async fn tick(&self) -> Result<(), SpindleError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Ran,
    /// Another instance holds the lock.
    Skipped,
}

pub struct ExclusiveSchedule {
    lock: LockManager,
    interval: Duration,
    job: Arc<dyn TickJob>,
}

impl ExclusiveSchedule {
    pub fn new(lock: LockManager, interval: Duration, job: Arc<dyn TickJob>) -> Self {
        Self {
            lock,
            interval,
            job,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn lock(&self) -> &LockManager {
        &self.lock
    }

    /// Take or renew the lock, then run the job once.
    pub async fn tick_once(&self) -> Result<TickStatus, SpindleError> {
        match self.lock.try_lock().await {
            Ok(()) => {}
            Err(e) if e.is_contention() => return Ok(TickStatus::Skipped),
            Err(e) => return Err(e),
        }

        let started = Instant::now();
        let result = self.job.tick().await;
        let elapsed = started.elapsed();

        if elapsed >= self.lock.ttl() {
            tracing::warn!(
                job = %self.job.name(),
                lock = %self.lock.name(),
                elapsed_ms = elapsed.as_millis() as u64,
                ttl_ms = self.lock.ttl().as_millis() as u64,
                "tick outlived the lock ttl; another instance may have started an overlapping run"
            );
        }

        result.map(|()| TickStatus::Ran)
    }
}

/// Handle to a set of running schedules.
/// - `request_shutdown` で新しい tick を止める（実行中の tick は最後まで走る）
/// - `shutdown_and_join` は終了を待ち、保持中の lock をすべて解放する
pub struct SchedulerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl SchedulerGroup {
    pub fn spawn(schedules: Vec<ExclusiveSchedule>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let joins = schedules
            .into_iter()
            .map(|schedule| {
                let rx = shutdown_rx.clone();
                tokio::spawn(schedule_loop(schedule, rx))
            })
            .collect();

        Self { shutdown_tx, joins }
    }

    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            if let Err(e) = join.await {
                tracing::error!(error = %e, "schedule task ended abnormally");
            }
        }
    }
}

async fn schedule_loop(schedule: ExclusiveSchedule, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        job = %schedule.job.name(),
        lock = %schedule.lock.name(),
        interval_ms = schedule.interval.as_millis() as u64,
        "schedule started"
    );

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        match schedule.tick_once().await {
            Ok(TickStatus::Ran) => {}
            Ok(TickStatus::Skipped) => {
                tracing::debug!(job = %schedule.job.name(), "tick skipped, not the leader");
            }
            Err(e) => {
                tracing::error!(job = %schedule.job.name(), error = %e, "tick failed");
            }
        }
    }

    if let Err(e) = schedule.lock.release().await {
        tracing::warn!(lock = %schedule.lock.name(), error = %e, "failed to release lock on shutdown");
    }
    tracing::info!(job = %schedule.job.name(), "schedule stopped");
}
