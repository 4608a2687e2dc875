//! IdGenerator ポート - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: 注入された clock の時刻で ULID を生成

use ulid::Ulid;

use crate::domain::ids::{PendingTaskId, WorkItemId};
use crate::ports::Clock;

/// Generates ids that are safe to create on any instance.
///
/// # ULID の特徴
/// - 作成時刻でソート可能
/// - インスタンス間の調整が不要
/// - 128-bit
pub trait IdGenerator: Send + Sync {
    fn generate_work_item_id(&self) -> WorkItemId;

    fn generate_pending_task_id(&self) -> PendingTaskId;

    /// Opaque holder token for the lock manager.
    fn generate_lock_token(&self) -> String;
}

/// ULID-based generator. The timestamp part comes from the clock, so a
/// `FixedClock` yields ids with a known prefix in tests.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_work_item_id(&self) -> WorkItemId {
        WorkItemId::from(self.next_ulid())
    }

    fn generate_pending_task_id(&self) -> PendingTaskId {
        PendingTaskId::from(self.next_ulid())
    }

    fn generate_lock_token(&self) -> String {
        self.next_ulid().to_string()
    }
}
