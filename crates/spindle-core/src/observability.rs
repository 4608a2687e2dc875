use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pending-task rows by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCounts {
    pub processing: usize,
    pub success: usize,
    pub failed: usize,
    pub timeout: usize,
}

/// What one poller tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub due: usize,
    pub rearmed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    /// Rows whose transition could not be written; they stay due and are
    /// picked up again next tick.
    pub persist_failed: usize,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.due == 0
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
