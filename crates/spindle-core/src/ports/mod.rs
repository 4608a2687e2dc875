//! Ports - the narrow interfaces the engine depends on.
//!
//! Each trait hides an external system: the shared key-value store for locks,
//! the relational pending-task table, the broker and its audit table. The
//! engine only ever talks to these traits; `impls` has in-memory versions.

pub mod broker;
pub mod clock;
pub mod id_generator;
pub mod lock_store;
pub mod pending_store;
pub mod work_store;

pub use self::broker::Broker;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::lock_store::LockStore;
pub use self::pending_store::PendingTaskStore;
pub use self::work_store::WorkRecordStore;
