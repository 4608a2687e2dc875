//! InMemoryBroker - development broker with one FIFO per logical queue.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{SpindleError, WorkItemId};
use crate::ports::Broker;

/// A submission as the broker stored it.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerMessage {
    pub broker_id: String,
    pub id: WorkItemId,
    pub body: Vec<u8>,
}

#[derive(Default)]
struct BrokerState {
    queues: HashMap<String, VecDeque<BrokerMessage>>,
    next_seq: u64,
}

#[derive(Default)]
pub struct InMemoryBroker {
    state: Mutex<BrokerState>,
    rejecting: AtomicBool,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every submission until switched back.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// Take the oldest message from `queue`.
    pub async fn pop(&self, queue: &str) -> Option<BrokerMessage> {
        let mut state = self.state.lock().await;
        state.queues.get_mut(queue).and_then(|q| q.pop_front())
    }

    pub async fn len(&self, queue: &str) -> usize {
        let state = self.state.lock().await;
        state.queues.get(queue).map_or(0, |q| q.len())
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn submit(
        &self,
        queue: &str,
        id: WorkItemId,
        body: Vec<u8>,
    ) -> Result<String, SpindleError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(SpindleError::Broker(format!("queue `{queue}` is not accepting work")));
        }
        let mut state = self.state.lock().await;
        state.next_seq += 1;
        let broker_id = format!("{queue}-{}", state.next_seq);
        state
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(BrokerMessage {
                broker_id: broker_id.clone(),
                id,
                body,
            });
        Ok(broker_id)
    }
}
