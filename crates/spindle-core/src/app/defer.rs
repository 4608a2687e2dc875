//! Deferrer - hand an external job over to the poller.
//!
//! Synchronous handlers call this right after the vendor accepted a job,
//! then return without waiting for it.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::pending::chrono_delay;
use crate::domain::{NewPendingTask, PendingTask, PendingTaskId, SpindleError, TaskType, WorkItemId};
use crate::ports::{Clock, IdGenerator, PendingTaskStore};
use crate::typed::{PayloadCodec, PendingPayload};

pub struct Deferrer {
    store: Arc<dyn PendingTaskStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    default_deadline: Option<Duration>,
}

impl Deferrer {
    pub fn new(
        store: Arc<dyn PendingTaskStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        default_deadline: Option<Duration>,
    ) -> Self {
        Self {
            store,
            ids,
            clock,
            default_deadline,
        }
    }

    /// Persist a fresh `Processing` row. A row without a deadline gets the
    /// configured default.
    pub async fn defer(&self, mut new: NewPendingTask) -> Result<PendingTaskId, SpindleError> {
        let id = self.ids.generate_pending_task_id();
        let now = self.clock.now();
        if new.deadline_at.is_none() {
            new.deadline_at = self.default_deadline.map(|d| now + chrono_delay(d));
        }
        let task = PendingTask::new(id, new, now);
        let task_id = task.task_id;
        let task_type = task.task_type.clone();

        self.store.create(task).await?;
        tracing::debug!(
            pending_task_id = %id,
            task_id = %task_id,
            task_type = %task_type,
            "pending task deferred"
        );
        Ok(id)
    }

    /// Persist a typed payload under `T::TYPE`. `deadline_after` of `None`
    /// falls back to the configured default deadline.
    pub async fn defer_typed<T: PendingPayload>(
        &self,
        task_id: WorkItemId,
        payload: &T,
        first_check_after: Duration,
        deadline_after: Option<Duration>,
    ) -> Result<PendingTaskId, SpindleError> {
        let now = self.clock.now();
        self.defer(NewPendingTask {
            task_id,
            task_type: TaskType::new(T::TYPE),
            payload: PayloadCodec::encode(payload)?,
            next_execute_at: now + chrono_delay(first_check_after),
            deadline_at: deadline_after.map(|d| now + chrono_delay(d)),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PendingTaskStatus;
    use crate::impls::InMemoryPendingTaskStore;
    use crate::ports::{FixedClock, UlidGenerator};
    use crate::test_support::ImageJob;
    use chrono::Utc;
    use rstest::rstest;

    fn deferrer(default_deadline: Option<Duration>) -> (Arc<FixedClock>, Arc<InMemoryPendingTaskStore>, Deferrer) {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let store = Arc::new(InMemoryPendingTaskStore::new(clock.clone()));
        let deferrer = Deferrer::new(
            store.clone(),
            Arc::new(UlidGenerator::new(clock.clone())),
            clock.clone(),
            default_deadline,
        );
        (clock, store, deferrer)
    }

    fn job() -> ImageJob {
        ImageJob {
            vendor_job_id: "vendor-42".into(),
            prompt: "a lighthouse".into(),
        }
    }

    #[tokio::test]
    async fn typed_defer_stores_processing_row() {
        let (clock, store, deferrer) = deferrer(None);
        let task_id = WorkItemId::from_ulid(ulid::Ulid::new());

        let id = deferrer
            .defer_typed(task_id, &job(), Duration::from_secs(10), Some(Duration::from_secs(600)))
            .await
            .unwrap();

        let row = store.get(id).await.unwrap().unwrap();
        let now = clock.now();
        assert_eq!(row.status, PendingTaskStatus::Processing);
        assert_eq!(row.execute_times, 0);
        assert_eq!(row.task_id, task_id);
        assert_eq!(row.task_type.as_str(), ImageJob::TYPE);
        assert_eq!(row.payload["vendor_job_id"], "vendor-42");
        assert_eq!(row.next_execute_at, now + chrono::Duration::seconds(10));
        assert_eq!(row.deadline_at, Some(now + chrono::Duration::seconds(600)));
    }

    #[rstest]
    #[case::explicit_wins(Some(3600), Some(60), Some(60))]
    #[case::default_applies(Some(3600), None, Some(3600))]
    #[case::no_deadline(None, None, None)]
    #[tokio::test]
    async fn deadline_falls_back_to_default(
        #[case] default_secs: Option<u64>,
        #[case] explicit_secs: Option<u64>,
        #[case] expected_secs: Option<i64>,
    ) {
        let (clock, store, deferrer) = deferrer(default_secs.map(Duration::from_secs));

        let id = deferrer
            .defer_typed(
                WorkItemId::from_ulid(ulid::Ulid::new()),
                &job(),
                Duration::ZERO,
                explicit_secs.map(Duration::from_secs),
            )
            .await
            .unwrap();

        let row = store.get(id).await.unwrap().unwrap();
        let expected = expected_secs.map(|s| clock.now() + chrono::Duration::seconds(s));
        assert_eq!(row.deadline_at, expected);
    }

    #[tokio::test]
    async fn raw_defer_applies_default_deadline() {
        let (clock, store, deferrer) = deferrer(Some(Duration::from_secs(900)));
        let now = clock.now();

        let id = deferrer
            .defer(NewPendingTask {
                task_id: WorkItemId::from_ulid(ulid::Ulid::new()),
                task_type: TaskType::new(ImageJob::TYPE),
                payload: serde_json::json!({"vendor_job_id": "raw", "prompt": "p"}),
                next_execute_at: now,
                deadline_at: None,
            })
            .await
            .unwrap();

        let row = store.get(id).await.unwrap().unwrap();
        assert_eq!(row.deadline_at, Some(now + chrono::Duration::seconds(900)));
    }

    #[tokio::test]
    async fn zero_first_check_is_due_immediately() {
        let (clock, store, deferrer) = deferrer(None);
        deferrer
            .defer_typed(WorkItemId::from_ulid(ulid::Ulid::new()), &job(), Duration::ZERO, None)
            .await
            .unwrap();

        assert_eq!(store.list_due(clock.now()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn store_outage_is_returned() {
        let (_clock, store, deferrer) = deferrer(None);
        store.set_unavailable(true);

        let err = deferrer
            .defer_typed(WorkItemId::from_ulid(ulid::Ulid::new()), &job(), Duration::ZERO, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SpindleError::StoreTransport(_)));
    }
}
