//! LockStore port - the shared key-value store behind the lock manager.
//!
//! Both operations must be atomic on the store side (a single Lua script on
//! Redis, a single critical section in memory). A GET-then-DEL split would let
//! a stale holder delete a lock that expired and was re-acquired elsewhere.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::SpindleError;

#[async_trait]
pub trait LockStore: Send + Sync {
    /// Set `key` to `token` with `ttl` if the key is absent, or refresh the
    /// TTL if it already holds `token`. Returns `false` when another token
    /// holds the key.
    async fn acquire_or_renew(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, SpindleError>;

    /// Delete `key` only if it holds `token`. Returns whether a delete
    /// happened.
    async fn release_if_owner(&self, key: &str, token: &str) -> Result<bool, SpindleError>;
}
