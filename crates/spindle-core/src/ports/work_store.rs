//! WorkRecordStore port - audit trail of enqueued work.

use async_trait::async_trait;

use crate::domain::{SpindleError, WorkItemId, WorkRecord};

#[async_trait]
pub trait WorkRecordStore: Send + Sync {
    async fn insert(&self, record: WorkRecord) -> Result<(), SpindleError>;

    async fn get(&self, id: WorkItemId) -> Result<Option<WorkRecord>, SpindleError>;
}
