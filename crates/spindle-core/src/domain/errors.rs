//! Errors - error type and operational classification.

use thiserror::Error;

use super::ids::PendingTaskId;
use super::pending::PendingTaskStatus;
use super::task_type::TaskType;

/// Operational classification of a failure.
///
/// - Contention: another instance is doing the work; skip quietly.
/// - Permanent: the row or call is finished; retrying will not help.
/// - Infrastructure: store, repository or broker outage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Contention,
    Permanent,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum SpindleError {
    #[error("lock `{name}` is held by another instance")]
    LockContended { name: String },

    #[error("store unavailable: {0}")]
    StoreTransport(String),

    #[error("handler not found for task_type={0}")]
    HandlerNotFound(TaskType),

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("handler panicked: {0}")]
    HandlerPanicked(String),

    #[error("payload encode failed for task_type={task_type}: {source}")]
    PayloadEncode {
        task_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("payload decode failed for task_type={task_type}: {source}")]
    PayloadDecode {
        task_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("pending task {0} not found")]
    PendingTaskNotFound(PendingTaskId),

    #[error("pending task {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: PendingTaskId,
        from: PendingTaskStatus,
        to: PendingTaskStatus,
    },

    #[error("broker rejected submission: {0}")]
    Broker(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SpindleError {
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LockContended { .. } => ErrorKind::Contention,
            Self::StoreTransport(_) | Self::Broker(_) => ErrorKind::Infrastructure,
            Self::Handler(_)
            | Self::HandlerNotFound(_)
            | Self::HandlerPanicked(_)
            | Self::PayloadEncode { .. }
            | Self::PayloadDecode { .. }
            | Self::PendingTaskNotFound(_)
            | Self::InvalidTransition { .. }
            | Self::Config(_) => ErrorKind::Permanent,
        }
    }

    /// `true` for the expected "another instance holds the lock" outcome.
    pub fn is_contention(&self) -> bool {
        self.kind() == ErrorKind::Contention
    }
}
