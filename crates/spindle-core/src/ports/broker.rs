//! Broker port - the task broker that actually executes work items.

use async_trait::async_trait;

use crate::domain::{SpindleError, WorkItemId};

#[async_trait]
pub trait Broker: Send + Sync {
    /// Submit a serialized work item to a logical queue. Returns the
    /// broker-assigned id.
    async fn submit(
        &self,
        queue: &str,
        id: WorkItemId,
        body: Vec<u8>,
    ) -> Result<String, SpindleError>;
}
