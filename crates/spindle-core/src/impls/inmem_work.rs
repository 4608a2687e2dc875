//! In-memory audit table for enqueued work.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{SpindleError, WorkItemId, WorkRecord};
use crate::ports::WorkRecordStore;

#[derive(Default)]
pub struct InMemoryWorkRecordStore {
    records: Mutex<HashMap<WorkItemId, WorkRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryWorkRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

#[async_trait]
impl WorkRecordStore for InMemoryWorkRecordStore {
    async fn insert(&self, record: WorkRecord) -> Result<(), SpindleError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SpindleError::StoreTransport("work record table unreachable".to_string()));
        }
        self.records.lock().await.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: WorkItemId) -> Result<Option<WorkRecord>, SpindleError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SpindleError::StoreTransport("work record table unreachable".to_string()));
        }
        Ok(self.records.lock().await.get(&id).cloned())
    }
}
