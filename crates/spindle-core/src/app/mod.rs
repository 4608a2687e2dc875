//! App - ports から組み立てるエンジン本体
//!
//! # コンポーネント
//! - **AppBuilder**: ワイヤリングと起動時検証
//! - **PendingTaskPoller**: due な pending task を 1 パス処理
//! - **Deferrer**: 新しい pending task を永続化
//! - **QueueDispatcher**: work item を broker へ渡す
//! - **ExclusiveSchedule / SchedulerGroup**: lock 付きの定期ジョブ

pub mod builder;
pub mod defer;
pub mod dispatch;
pub mod poller;
pub mod scheduler;

pub use self::builder::{App, AppBuilder, AppPorts, BuildError};
pub use self::defer::Deferrer;
pub use self::dispatch::QueueDispatcher;
pub use self::poller::PendingTaskPoller;
pub use self::scheduler::{ExclusiveSchedule, SchedulerGroup, TickJob, TickStatus};
