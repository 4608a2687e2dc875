//! QueueDispatcher - single entry point for handing work to the broker.

use std::sync::Arc;

use crate::domain::{SpindleError, WorkEnvelope, WorkItem, WorkItemId, WorkRecord};
use crate::ports::{Broker, Clock, IdGenerator, WorkRecordStore};

pub struct QueueDispatcher {
    broker: Arc<dyn Broker>,
    records: Arc<dyn WorkRecordStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl QueueDispatcher {
    pub fn new(
        broker: Arc<dyn Broker>,
        records: Arc<dyn WorkRecordStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            broker,
            records,
            ids,
            clock,
        }
    }

    /// Submit `item` and record it. Returns the id the executing worker
    /// will see.
    ///
    /// A broker failure is returned. A record failure after the broker
    /// accepted the work is only logged: the work is already in flight.
    pub async fn enqueue(&self, item: WorkItem) -> Result<WorkItemId, SpindleError> {
        let id = self.ids.generate_work_item_id();
        let envelope = WorkEnvelope {
            id,
            task_type: item.task_type.clone(),
            payload: item.payload,
        };
        let body = serde_json::to_vec(&envelope).map_err(|source| SpindleError::PayloadEncode {
            task_type: item.task_type.to_string(),
            source,
        })?;

        let broker_id = self
            .broker
            .submit(&item.queue, id, body.clone())
            .await
            .map_err(|e| {
                tracing::error!(
                    task_id = %id,
                    task_type = %item.task_type,
                    queue = %item.queue,
                    error = %e,
                    "broker rejected work item"
                );
                e
            })?;

        let record = WorkRecord {
            id,
            task_type: item.task_type,
            title: item.title,
            queue: item.queue,
            raw_payload: body,
            broker_id,
            enqueued_at: self.clock.now(),
        };
        let (task_type, queue, broker_id) = (
            record.task_type.clone(),
            record.queue.clone(),
            record.broker_id.clone(),
        );

        match self.records.insert(record).await {
            Ok(()) => {
                tracing::info!(task_id = %id, task_type = %task_type, queue = %queue, broker_id = %broker_id, "work item enqueued");
            }
            Err(e) => {
                tracing::warn!(
                    task_id = %id,
                    task_type = %task_type,
                    broker_id = %broker_id,
                    error = %e,
                    "work item submitted but its record could not be saved"
                );
            }
        }
        Ok(id)
    }
}
