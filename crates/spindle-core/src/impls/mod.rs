//! Impls - in-memory port implementations for development and tests.
//!
//! `RedisLockStore` (feature `redis`) is the production lock store. Adapters
//! for the pending-task and work-record tables and the real broker client
//! live outside this crate and implement the same `ports` traits.

pub mod inmem_broker;
pub mod inmem_lock;
pub mod inmem_pending;
pub mod inmem_work;
#[cfg(feature = "redis")]
pub mod redis_lock;

pub use self::inmem_broker::{BrokerMessage, InMemoryBroker};
pub use self::inmem_lock::InMemoryLockStore;
pub use self::inmem_pending::InMemoryPendingTaskStore;
pub use self::inmem_work::InMemoryWorkRecordStore;
#[cfg(feature = "redis")]
pub use self::redis_lock::RedisLockStore;
