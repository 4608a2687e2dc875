//! In-memory pending-task table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{PendingTask, PendingTaskId, PendingTaskStatus, PendingTaskUpdate, SpindleError};
use crate::observability::PendingCounts;
use crate::ports::{Clock, PendingTaskStore};

/// Pending-task rows keyed by id.
///
/// Mirrors what the relational table enforces: terminal rows reject further
/// updates, and `list_due` only returns processing rows whose time has come.
pub struct InMemoryPendingTaskStore {
    rows: Mutex<HashMap<PendingTaskId, PendingTask>>,
    clock: Arc<dyn Clock>,
    unavailable: AtomicBool,
}

impl InMemoryPendingTaskStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            clock,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate a repository outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn counts_by_status(&self) -> PendingCounts {
        let rows = self.rows.lock().await;
        let mut counts = PendingCounts::default();
        for row in rows.values() {
            match row.status {
                PendingTaskStatus::Processing => counts.processing += 1,
                PendingTaskStatus::Success => counts.success += 1,
                PendingTaskStatus::Failed => counts.failed += 1,
                PendingTaskStatus::Timeout => counts.timeout += 1,
            }
        }
        counts
    }

    fn check_available(&self) -> Result<(), SpindleError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SpindleError::StoreTransport(
                "pending task repository unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PendingTaskStore for InMemoryPendingTaskStore {
    async fn create(&self, task: PendingTask) -> Result<(), SpindleError> {
        self.check_available()?;
        let mut rows = self.rows.lock().await;
        rows.insert(task.id, task);
        Ok(())
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<PendingTask>, SpindleError> {
        self.check_available()?;
        let rows = self.rows.lock().await;
        let mut due: Vec<PendingTask> = rows.values().filter(|row| row.is_due(now)).cloned().collect();
        due.sort_by_key(|row| row.next_execute_at);
        Ok(due)
    }

    async fn update(
        &self,
        id: PendingTaskId,
        update: PendingTaskUpdate,
    ) -> Result<(), SpindleError> {
        self.check_available()?;
        let now = self.clock.now();
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(&id)
            .ok_or(SpindleError::PendingTaskNotFound(id))?;

        if !row.status.can_transition_to(update.status) {
            return Err(SpindleError::InvalidTransition {
                id,
                from: row.status,
                to: update.status,
            });
        }
        row.apply(&update, now);
        Ok(())
    }

    async fn get(&self, id: PendingTaskId) -> Result<Option<PendingTask>, SpindleError> {
        self.check_available()?;
        let rows = self.rows.lock().await;
        Ok(rows.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewPendingTask, TaskType, WorkItemId};
    use crate::ports::FixedClock;
    use ulid::Ulid;

    fn row(now: DateTime<Utc>, next: DateTime<Utc>) -> PendingTask {
        PendingTask::new(
            PendingTaskId::from_ulid(Ulid::new()),
            NewPendingTask {
                task_id: WorkItemId::from_ulid(Ulid::new()),
                task_type: TaskType::new("test.pending.v1"),
                payload: serde_json::json!({}),
                next_execute_at: next,
                deadline_at: None,
            },
            now,
        )
    }

    #[tokio::test]
    async fn list_due_skips_future_and_terminal_rows() {
        let now = Utc::now();
        let store = InMemoryPendingTaskStore::new(Arc::new(FixedClock::new(now)));

        let due = row(now, now - chrono::Duration::seconds(1));
        let later = row(now, now + chrono::Duration::seconds(5));
        let done = row(now, now - chrono::Duration::seconds(1));
        store.create(due.clone()).await.unwrap();
        store.create(later).await.unwrap();
        store.create(done.clone()).await.unwrap();
        store
            .update(done.id, PendingTaskUpdate::success(&done))
            .await
            .unwrap();

        let listed = store.list_due(now).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, due.id);
    }

    #[tokio::test]
    async fn terminal_rows_reject_updates() {
        let now = Utc::now();
        let store = InMemoryPendingTaskStore::new(Arc::new(FixedClock::new(now)));
        let task = row(now, now);
        store.create(task.clone()).await.unwrap();
        store
            .update(task.id, PendingTaskUpdate::timeout(&task))
            .await
            .unwrap();

        let err = store
            .update(task.id, PendingTaskUpdate::rearm(&task, now, std::time::Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SpindleError::InvalidTransition {
                from: PendingTaskStatus::Timeout,
                to: PendingTaskStatus::Processing,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn update_of_unknown_row_is_not_found() {
        let now = Utc::now();
        let store = InMemoryPendingTaskStore::new(Arc::new(FixedClock::new(now)));
        let task = row(now, now);
        let err = store
            .update(task.id, PendingTaskUpdate::success(&task))
            .await
            .unwrap_err();
        assert!(matches!(err, SpindleError::PendingTaskNotFound(id) if id == task.id));
    }

    #[tokio::test]
    async fn counts_follow_status() {
        let now = Utc::now();
        let store = InMemoryPendingTaskStore::new(Arc::new(FixedClock::new(now)));
        let a = row(now, now);
        let b = row(now, now);
        store.create(a.clone()).await.unwrap();
        store.create(b).await.unwrap();
        store
            .update(a.id, PendingTaskUpdate::failed(&a, "boom"))
            .await
            .unwrap();

        let counts = store.counts_by_status().await;
        assert_eq!(counts.processing, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.success, 0);
    }
}
