//! AppBuilder - ワイヤリングと起動時検証
//!
//! # 学習ポイント
//! - handler は起動前にまとめて登録する
//! - 期待する task_type に handler が無ければ `build()` で即エラー（Fail-fast）
//! - 実行時に poller が行ごとに Failed にするより早く気づける

use std::sync::Arc;
use std::time::Duration;

use crate::config::SpindleConfig;
use crate::domain::{SpindleError, TaskType};
use crate::lock::LockManager;
use crate::ports::{Broker, Clock, IdGenerator, LockStore, PendingTaskStore, WorkRecordStore};
use crate::typed::{DynPendingHandler, HandlerRegistry, PendingHandler, PendingPayload};

use super::defer::Deferrer;
use super::dispatch::QueueDispatcher;
use super::poller::PendingTaskPoller;
use super::scheduler::{ExclusiveSchedule, TickJob};

/// エンジンが依存する外部システム（ports）
#[derive(Clone)]
pub struct AppPorts {
    pub locks: Arc<dyn LockStore>,
    pub pending: Arc<dyn PendingTaskStore>,
    pub broker: Arc<dyn Broker>,
    pub records: Arc<dyn WorkRecordStore>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
}

/// # Example
/// ```ignore
/// let app = AppBuilder::new(ports, config)
///     .register_typed::<ImageJob, _>(ImageJobHandler::new(vendor))
///     .expect_tasks(&[ImageJob::TYPE])
///     .build()?;
/// ```
pub struct AppBuilder {
    ports: AppPorts,
    config: SpindleConfig,
    registry: HandlerRegistry,
    expected_tasks: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task types: {0:?}. These tasks were expected but not registered.")]
    MissingTaskTypes(Vec<String>),

    #[error(transparent)]
    InvalidConfig(#[from] SpindleError),
}

impl AppBuilder {
    pub fn new(ports: AppPorts, config: SpindleConfig) -> Self {
        Self {
            ports,
            config,
            registry: HandlerRegistry::new(),
            expected_tasks: None,
        }
    }

    pub fn register_typed<T: PendingPayload, H: PendingHandler<T> + 'static>(self, handler: H) -> Self {
        self.registry.register_typed::<T, H>(handler);
        self
    }

    /// Register an untyped handler, e.g. one that reads several payload
    /// versions itself.
    pub fn register_dyn(self, task_type: impl Into<TaskType>, handler: Arc<dyn DynPendingHandler>) -> Self {
        self.registry.register(task_type, handler);
        self
    }

    pub fn expect_tasks(mut self, task_types: &[&str]) -> Self {
        self.expected_tasks = Some(task_types.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Validate config and expected task types, then wire everything.
    pub fn build(self) -> Result<App, BuildError> {
        self.config.validate()?;

        if let Some(expected_tasks) = &self.expected_tasks {
            let registered_types = self.registry.registered_types();
            let missing_tasks: Vec<String> = expected_tasks
                .iter()
                .filter(|x| !registered_types.contains(x))
                .cloned()
                .collect();
            if !missing_tasks.is_empty() {
                return Err(BuildError::MissingTaskTypes(missing_tasks));
            }
        }

        let ports = self.ports;
        let registry = Arc::new(self.registry);
        let poller = Arc::new(PendingTaskPoller::new(
            Arc::clone(&ports.pending),
            Arc::clone(&registry),
            Arc::clone(&ports.clock),
            self.config.rearm_delay,
        ));
        let deferrer = Deferrer::new(
            Arc::clone(&ports.pending),
            Arc::clone(&ports.ids),
            Arc::clone(&ports.clock),
            self.config.default_deadline,
        );
        let dispatcher = QueueDispatcher::new(
            Arc::clone(&ports.broker),
            Arc::clone(&ports.records),
            Arc::clone(&ports.ids),
            Arc::clone(&ports.clock),
        );

        tracing::info!(
            handlers = registry.len(),
            poll_interval_secs = self.config.poll_interval.as_secs(),
            lock_ttl_secs = self.config.lock_ttl.as_secs(),
            "spindle app built"
        );

        Ok(App {
            registry,
            poller,
            deferrer,
            dispatcher,
            config: self.config,
            ports,
        })
    }
}

/// A wired engine. Cheap handles; share with `Arc<App>` if needed.
pub struct App {
    pub registry: Arc<HandlerRegistry>,
    pub poller: Arc<PendingTaskPoller>,
    pub deferrer: Deferrer,
    pub dispatcher: QueueDispatcher,
    config: SpindleConfig,
    ports: AppPorts,
}

impl App {
    pub fn config(&self) -> &SpindleConfig {
        &self.config
    }

    /// A lock manager on the shared lock store.
    pub fn lock(&self, name: impl Into<String>, ttl: Duration) -> LockManager {
        LockManager::new(Arc::clone(&self.ports.locks), Arc::clone(&self.ports.ids), name, ttl)
    }

    /// The poller guarded by the configured poll lock.
    pub fn poll_schedule(&self) -> ExclusiveSchedule {
        let lock = self.lock(self.config.poll_lock_name.clone(), self.config.lock_ttl);
        ExclusiveSchedule::new(lock, self.config.poll_interval, self.poller.clone())
    }

    /// Any other recurring job that must run on one instance at a time.
    pub fn exclusive(
        &self,
        lock_name: impl Into<String>,
        interval: Duration,
        ttl: Duration,
        job: Arc<dyn TickJob>,
    ) -> ExclusiveSchedule {
        ExclusiveSchedule::new(self.lock(lock_name, ttl), interval, job)
    }
}
