//! PayloadCodec - JSON <-> typed payload at the handler boundary.

use super::task::PendingPayload;
use crate::domain::{PendingTask, SpindleError};

pub struct PayloadCodec;

impl PayloadCodec {
    pub fn encode<T: PendingPayload>(payload: &T) -> Result<serde_json::Value, SpindleError> {
        serde_json::to_value(payload).map_err(|source| SpindleError::PayloadEncode {
            task_type: T::TYPE.to_string(),
            source,
        })
    }

    pub fn decode<T: PendingPayload>(task: &PendingTask) -> Result<T, SpindleError> {
        serde_json::from_value(task.payload.clone()).map_err(|source| {
            SpindleError::PayloadDecode {
                task_type: task.task_type.to_string(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{VideoJob, pending_row};
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    /// JSON object keys must be strings, so this cannot be encoded.
    #[derive(Serialize, Deserialize)]
    struct TupleKeyed {
        frames: BTreeMap<(u32, u32), String>,
    }

    impl PendingPayload for TupleKeyed {
        const TYPE: &'static str = "test.tuple_keyed.v1";
    }

    #[test]
    fn encode_failure_is_an_encode_error() {
        let payload = TupleKeyed {
            frames: BTreeMap::from([((1, 2), "a".to_string())]),
        };

        let err = PayloadCodec::encode(&payload).unwrap_err();
        assert!(matches!(
            err,
            SpindleError::PayloadEncode { ref task_type, .. } if task_type == TupleKeyed::TYPE
        ));
        assert!(err.to_string().starts_with("payload encode failed"));
    }

    #[test]
    fn decode_failure_is_a_decode_error() {
        let row = pending_row::<VideoJob>(serde_json::json!({"id": 3}), Utc::now(), None);

        let err = PayloadCodec::decode::<VideoJob>(&row).unwrap_err();
        assert!(matches!(err, SpindleError::PayloadDecode { .. }));
    }

    #[test]
    fn encode_then_decode_keeps_the_payload() {
        let job = VideoJob {
            vendor_job_id: "v-1".into(),
        };
        let row = pending_row::<VideoJob>(PayloadCodec::encode(&job).unwrap(), Utc::now(), None);
        assert_eq!(PayloadCodec::decode::<VideoJob>(&row).unwrap(), job);
    }
}
