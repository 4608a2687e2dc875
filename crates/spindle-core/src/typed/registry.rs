//! HandlerRegistry - poller 用の task_type -> handler 対応表
//!
//! 起動時に 1 回構築し、`Arc<HandlerRegistry>` で共有する。
//! 読み込みは並行、書き込みは稀（起動時・機能切替）なので `RwLock` で守る。
//! lookup は `Arc` を clone してすぐ lock を離すため、`.await` をまたいで
//! lock を保持することはない。

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::handler::{DynPendingHandler, PendingHandler, TypedPendingHandler};
use super::task::PendingPayload;
use crate::domain::TaskType;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<TaskType, Arc<dyn DynPendingHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `task_type`. Last registration wins.
    pub fn register(&self, task_type: impl Into<TaskType>, handler: Arc<dyn DynPendingHandler>) {
        let task_type = task_type.into();
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.insert(task_type.clone(), handler).is_some() {
            tracing::debug!(task_type = %task_type, "replaced pending task handler");
        }
    }

    /// Register a typed handler under `T::TYPE`.
    pub fn register_typed<T: PendingPayload, H: PendingHandler<T> + 'static>(&self, handler: H) {
        self.register(T::TYPE, Arc::new(TypedPendingHandler::<T, H>::new(handler)));
    }

    pub fn get(&self, task_type: &TaskType) -> Option<Arc<dyn DynPendingHandler>> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers.get(task_type).cloned()
    }

    /// Unregister a type. Returns whether a handler was present.
    pub fn remove(&self, task_type: &TaskType) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers.remove(task_type).is_some()
    }

    pub fn registered_types(&self) -> Vec<String> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers.keys().map(|t| t.as_str().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PendingTaskStatus;
    use crate::test_support::{FailHandler, ImageJob, SucceedHandler, VideoJob, pending_row};
    use crate::typed::PollContext;
    use chrono::Utc;

    #[test]
    fn register_and_get() {
        let registry = HandlerRegistry::new();
        registry.register_typed::<VideoJob, _>(SucceedHandler);

        assert!(registry.get(&TaskType::new(VideoJob::TYPE)).is_some());
        assert!(registry.get(&TaskType::new(ImageJob::TYPE)).is_none());
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let registry = HandlerRegistry::new();
        registry.register_typed::<VideoJob, _>(FailHandler::new("first"));
        registry.register_typed::<VideoJob, _>(SucceedHandler);
        assert_eq!(registry.len(), 1);

        let now = Utc::now();
        let row = pending_row::<VideoJob>(serde_json::json!({"vendor_job_id": "v"}), now, None);
        let handler = registry.get(&row.task_type).unwrap();
        let update = handler.check_dyn(&row, &PollContext { now }).await.unwrap();
        assert_eq!(update.status, PendingTaskStatus::Success);
    }

    #[test]
    fn remove_unregisters() {
        let registry = HandlerRegistry::new();
        registry.register_typed::<ImageJob, _>(SucceedHandler);

        assert!(registry.remove(&TaskType::new(ImageJob::TYPE)));
        assert!(!registry.remove(&TaskType::new(ImageJob::TYPE)));
        assert!(registry.is_empty());
    }

    #[test]
    fn registered_types_lists_every_type() {
        let registry = HandlerRegistry::new();
        registry.register_typed::<ImageJob, _>(SucceedHandler);
        registry.register_typed::<VideoJob, _>(SucceedHandler);

        let mut types = registry.registered_types();
        types.sort();
        assert_eq!(types, vec![ImageJob::TYPE.to_string(), VideoJob::TYPE.to_string()]);
    }

    #[test]
    fn concurrent_reads_during_registration() {
        let registry = Arc::new(HandlerRegistry::new());
        registry.register_typed::<ImageJob, _>(SucceedHandler);

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        assert!(registry.get(&TaskType::new(ImageJob::TYPE)).is_some());
                    }
                })
            })
            .collect();
        registry.register_typed::<VideoJob, _>(SucceedHandler);

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(registry.len(), 2);
    }
}
