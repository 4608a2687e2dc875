//! Distributed lock manager for recurring jobs.
//!
//! A named lock lives in the shared key-value store as
//! `spindle:lock:{name} = token` with a TTL. The token is generated on the
//! first `try_lock` and kept for the manager's lifetime, so a second
//! `try_lock` from the same manager renews instead of failing against itself.
//! Release only deletes the key while it still holds this token.
//!
//! # Example
//!
//! ```ignore
//! let lock = LockManager::new(store, ids, "health_check", Duration::from_secs(120));
//! match lock.try_lock().await {
//!     Ok(()) => run_health_check().await,
//!     Err(e) if e.is_contention() => {} // another instance has this tick
//!     Err(e) => return Err(e),
//! }
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::domain::SpindleError;
use crate::ports::{IdGenerator, LockStore};

const KEY_PREFIX: &str = "spindle:lock:";

pub struct LockManager {
    store: Arc<dyn LockStore>,
    ids: Arc<dyn IdGenerator>,
    name: String,
    key: String,
    ttl: Duration,
    token: OnceLock<String>,
}

impl LockManager {
    pub fn new(
        store: Arc<dyn LockStore>,
        ids: Arc<dyn IdGenerator>,
        name: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let name = name.into();
        Self {
            store,
            ids,
            key: format!("{KEY_PREFIX}{name}"),
            name,
            ttl,
            token: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store key, e.g. `spindle:lock:pending_task_poller`.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// This holder's token, once `try_lock` has been called.
    pub fn token(&self) -> Option<&str> {
        self.token.get().map(String::as_str)
    }

    /// Become, or stay, the sole holder for `ttl`.
    ///
    /// `LockContended` is the normal answer on every instance but one and
    /// is not an error worth logging above debug.
    pub async fn try_lock(&self) -> Result<(), SpindleError> {
        let token = self.token.get_or_init(|| self.ids.generate_lock_token());
        let acquired = self.store.acquire_or_renew(&self.key, token, self.ttl).await?;
        if acquired {
            Ok(())
        } else {
            tracing::debug!(lock = %self.name, "lock held by another instance");
            Err(SpindleError::LockContended {
                name: self.name.clone(),
            })
        }
    }

    /// Give the lock up. Never touches a lock held under another token.
    pub async fn release(&self) -> Result<(), SpindleError> {
        let Some(token) = self.token.get() else {
            return Ok(());
        };
        if !self.store.release_if_owner(&self.key, token).await? {
            tracing::debug!(lock = %self.name, "release skipped, lock not held by this instance");
        }
        Ok(())
    }
}
