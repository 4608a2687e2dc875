//! Domain model (ids, task types, pending tasks, work items, errors).

pub mod errors;
pub mod ids;
pub mod pending;
pub mod task_type;
pub mod work;

pub use self::errors::{ErrorKind, SpindleError};
pub use self::ids::{PendingTaskId, WorkItemId};
pub use self::pending::{NewPendingTask, PendingTask, PendingTaskStatus, PendingTaskUpdate};
pub use self::task_type::TaskType;
pub use self::work::{DEFAULT_QUEUE, WorkEnvelope, WorkItem, WorkRecord};
