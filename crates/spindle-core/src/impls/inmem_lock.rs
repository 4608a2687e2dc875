//! InMemoryLockStore - a single-process stand-in for the shared KV store.
//!
//! Each operation runs inside one critical section, which gives the same
//! atomicity a Redis script gives across processes. Expiry is evaluated
//! lazily against the injected clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::SpindleError;
use crate::domain::pending::chrono_delay;
use crate::ports::{Clock, LockStore};

#[derive(Debug, Clone)]
struct LockEntry {
    token: String,
    expires_at: DateTime<Utc>,
}

pub struct InMemoryLockStore {
    entries: Mutex<HashMap<String, LockEntry>>,
    clock: Arc<dyn Clock>,
    unavailable: AtomicBool,
}

impl InMemoryLockStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Token currently holding `key`, if any and not expired.
    pub fn holder(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.token.clone())
    }

    /// Overwrite `key` unconditionally, as an operator or another process
    /// would after the original holder's TTL ran out.
    pub fn force_set(&self, key: &str, token: &str, ttl: Duration) {
        let expires_at = self.clock.now() + chrono_delay(ttl);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.to_string(),
            LockEntry {
                token: token.to_string(),
                expires_at,
            },
        );
    }

    /// Simulate a store outage: every call fails with `StoreTransport`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), SpindleError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SpindleError::StoreTransport(
                "lock store unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn acquire_or_renew(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, SpindleError> {
        self.check_available()?;
        let now = self.clock.now();
        let expires_at = now + chrono_delay(ttl);

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SpindleError::StoreTransport("lock table poisoned".to_string()))?;

        let held_by_other = entries
            .get(key)
            .is_some_and(|entry| entry.expires_at > now && entry.token != token);
        if held_by_other {
            return Ok(false);
        }

        // absent, expired, or ours: (re)write with a fresh expiry
        entries.insert(
            key.to_string(),
            LockEntry {
                token: token.to_string(),
                expires_at,
            },
        );
        Ok(true)
    }

    async fn release_if_owner(&self, key: &str, token: &str) -> Result<bool, SpindleError> {
        self.check_available()?;
        let now = self.clock.now();

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SpindleError::StoreTransport("lock table poisoned".to_string()))?;

        let owned = entries
            .get(key)
            .is_some_and(|entry| entry.token == token && entry.expires_at > now);
        if owned {
            entries.remove(key);
        }
        Ok(owned)
    }
}
