//! RedisLockStore - LockStore on a shared Redis.
//!
//! 両操作とも Lua script 1 本で実行する（GET → SET / GET → DEL の間に
//! 他インスタンスが割り込めない）。
//!
//! - acquire: key が無ければ `SET key token PX ttl`、自分の token なら
//!   `PEXPIRE`、他人の token なら 0
//! - release: 自分の token のときだけ `DEL`
//!
//! Enabled with the `redis` cargo feature.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{RedisError, Script};

use crate::domain::SpindleError;
use crate::ports::LockStore;

const ACQUIRE_OR_RENEW: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
  redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[2])
  return 1
end
if current == ARGV[1] then
  redis.call('PEXPIRE', KEYS[1], ARGV[2])
  return 1
end
return 0
"#;

const RELEASE_IF_OWNER: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('DEL', KEYS[1])
end
return 0
"#;

#[derive(Clone)]
pub struct RedisLockStore {
    conn: MultiplexedConnection,
    acquire: Script,
    release: Script,
}

impl RedisLockStore {
    /// Connect to `redis_url` (e.g. `redis://localhost:6379`).
    pub async fn connect(redis_url: impl AsRef<str>) -> Result<Self, SpindleError> {
        let client = redis::Client::open(redis_url.as_ref()).map_err(transport)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(transport)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            acquire: Script::new(ACQUIRE_OR_RENEW),
            release: Script::new(RELEASE_IF_OWNER),
        }
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn acquire_or_renew(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, SpindleError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.acquire.prepare_invoke();
        invocation.key(key).arg(token).arg(ttl_millis(ttl));
        let acquired: i64 = invocation.invoke_async(&mut conn).await.map_err(transport)?;
        Ok(acquired == 1)
    }

    async fn release_if_owner(&self, key: &str, token: &str) -> Result<bool, SpindleError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.release.prepare_invoke();
        invocation.key(key).arg(token);
        let deleted: i64 = invocation.invoke_async(&mut conn).await.map_err(transport)?;
        Ok(deleted == 1)
    }
}

/// PX は 1ms 以上の整数でないと Redis がエラーを返す
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn transport(e: RedisError) -> SpindleError {
    SpindleError::StoreTransport(format!("redis: {e}"))
}
