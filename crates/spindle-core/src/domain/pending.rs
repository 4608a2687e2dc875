//! Pending task record: an external job that started synchronously and is
//! finishing somewhere else.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{PendingTaskId, WorkItemId};
use super::task_type::TaskType;

/// Pending task status.
///
/// State transitions:
/// - Processing -> Processing (re-armed, next_execute_at advanced)
/// - Processing -> Success
/// - Processing -> Failed
/// - Processing -> Timeout (deadline passed)
///
/// Success, Failed and Timeout are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingTaskStatus {
    Processing,
    Success,
    Failed,
    Timeout,
}

impl PendingTaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PendingTaskStatus::Processing)
    }

    /// Only a row still processing may move; it may move anywhere.
    pub fn can_transition_to(self, _next: PendingTaskStatus) -> bool {
        self == PendingTaskStatus::Processing
    }
}

/// A persisted row of the pending-task table.
///
/// `payload` is opaque to the engine; only the handler registered for
/// `task_type` knows how to read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTask {
    pub id: PendingTaskId,
    /// The unit of work that started the external job.
    pub task_id: WorkItemId,
    pub task_type: TaskType,
    pub payload: serde_json::Value,
    pub status: PendingTaskStatus,
    pub next_execute_at: DateTime<Utc>,
    /// Hard ceiling; `None` means the row never times out on its own.
    pub deadline_at: Option<DateTime<Utc>>,
    pub execute_times: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingTask {
    /// Build a fresh `Processing` row.
    pub fn new(id: PendingTaskId, new: NewPendingTask, now: DateTime<Utc>) -> Self {
        Self {
            id,
            task_id: new.task_id,
            task_type: new.task_type,
            payload: new.payload,
            status: PendingTaskStatus::Processing,
            next_execute_at: new.next_execute_at,
            deadline_at: new.deadline_at,
            execute_times: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == PendingTaskStatus::Processing && self.next_execute_at <= now
    }

    pub fn is_deadline_exceeded(&self, now: DateTime<Utc>) -> bool {
        self.deadline_at.is_some_and(|deadline| deadline <= now)
    }

    /// Apply an update in place. Callers check the transition first.
    pub fn apply(&mut self, update: &PendingTaskUpdate, now: DateTime<Utc>) {
        self.status = update.status;
        if let Some(next) = update.next_execute_at {
            self.next_execute_at = next;
        }
        self.execute_times = update.execute_times;
        if update.error.is_some() {
            self.last_error = update.error.clone();
        }
        self.updated_at = now;
    }
}

/// Everything a synchronous handler supplies when it hands a job over.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPendingTask {
    pub task_id: WorkItemId,
    pub task_type: TaskType,
    pub payload: serde_json::Value,
    pub next_execute_at: DateTime<Utc>,
    pub deadline_at: Option<DateTime<Utc>>,
}

/// The transition a handler (or the poller) wants persisted for one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTaskUpdate {
    pub status: PendingTaskStatus,
    /// Required when `status` is `Processing`; the poller fills a default
    /// delay when a handler leaves it empty.
    pub next_execute_at: Option<DateTime<Utc>>,
    pub execute_times: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PendingTaskUpdate {
    /// Still running at the vendor: check again after `delay`.
    pub fn rearm(task: &PendingTask, now: DateTime<Utc>, delay: Duration) -> Self {
        Self {
            status: PendingTaskStatus::Processing,
            next_execute_at: Some(now + chrono_delay(delay)),
            execute_times: task.execute_times + 1,
            error: None,
        }
    }

    /// Vendor job finished and the handler finalized it.
    pub fn success(task: &PendingTask) -> Self {
        Self {
            status: PendingTaskStatus::Success,
            next_execute_at: None,
            execute_times: task.execute_times + 1,
            error: None,
        }
    }

    pub fn failed(task: &PendingTask, reason: impl Into<String>) -> Self {
        Self {
            status: PendingTaskStatus::Failed,
            next_execute_at: None,
            execute_times: task.execute_times + 1,
            error: Some(reason.into()),
        }
    }

    /// Deadline passed; no handler ran, so the counter is left alone.
    pub fn timeout(task: &PendingTask) -> Self {
        Self {
            status: PendingTaskStatus::Timeout,
            next_execute_at: None,
            execute_times: task.execute_times,
            error: Some("deadline exceeded".to_string()),
        }
    }
}

/// std -> chrono duration. Out-of-range values clamp to a century, which is
/// still safe to add to `Utc::now()`.
pub fn chrono_delay(delay: Duration) -> chrono::Duration {
    chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ulid::Ulid;

    fn processing_task(now: DateTime<Utc>) -> PendingTask {
        PendingTask::new(
            PendingTaskId::from_ulid(Ulid::new()),
            NewPendingTask {
                task_id: WorkItemId::from_ulid(Ulid::new()),
                task_type: TaskType::new("media.image.generate.v1"),
                payload: serde_json::json!({"job": "abc"}),
                next_execute_at: now,
                deadline_at: Some(now + chrono::Duration::hours(1)),
            },
            now,
        )
    }

    #[rstest]
    #[case::processing(PendingTaskStatus::Processing, false)]
    #[case::success(PendingTaskStatus::Success, true)]
    #[case::failed(PendingTaskStatus::Failed, true)]
    #[case::timeout(PendingTaskStatus::Timeout, true)]
    fn terminal_statuses(#[case] status: PendingTaskStatus, #[case] terminal: bool) {
        assert_eq!(status.is_terminal(), terminal);
        assert_eq!(
            status.can_transition_to(PendingTaskStatus::Success),
            !terminal
        );
    }

    #[test]
    fn new_task_starts_processing_with_zero_attempts() {
        let now = Utc::now();
        let task = processing_task(now);
        assert_eq!(task.status, PendingTaskStatus::Processing);
        assert_eq!(task.execute_times, 0);
        assert!(task.is_due(now));
        assert!(!task.is_due(now - chrono::Duration::seconds(1)));
    }

    #[test]
    fn rearm_advances_next_check_and_counts_attempt() {
        let now = Utc::now();
        let task = processing_task(now);
        let update = PendingTaskUpdate::rearm(&task, now, Duration::from_secs(5));

        assert_eq!(update.status, PendingTaskStatus::Processing);
        assert_eq!(update.next_execute_at, Some(now + chrono::Duration::seconds(5)));
        assert_eq!(update.execute_times, 1);
    }

    #[test]
    fn timeout_keeps_attempt_counter() {
        let now = Utc::now();
        let mut task = processing_task(now);
        task.execute_times = 3;
        let update = PendingTaskUpdate::timeout(&task);
        assert_eq!(update.execute_times, 3);
        assert_eq!(update.status, PendingTaskStatus::Timeout);
    }

    #[test]
    fn deadline_is_inclusive_and_optional() {
        let now = Utc::now();
        let mut task = processing_task(now);
        task.deadline_at = Some(now);
        assert!(task.is_deadline_exceeded(now));

        task.deadline_at = None;
        assert!(!task.is_deadline_exceeded(now + chrono::Duration::days(365)));
    }

    #[test]
    fn apply_keeps_next_check_when_update_has_none() {
        let now = Utc::now();
        let mut task = processing_task(now);
        let before = task.next_execute_at;
        task.apply(&PendingTaskUpdate::failed(&task, "vendor said no"), now);

        assert_eq!(task.status, PendingTaskStatus::Failed);
        assert_eq!(task.next_execute_at, before);
        assert_eq!(task.last_error.as_deref(), Some("vendor said no"));
    }

    #[test]
    fn status_serializes_snake_case() {
        let s = serde_json::to_string(&PendingTaskStatus::Timeout).unwrap();
        assert_eq!(s, "\"timeout\"");
    }
}
