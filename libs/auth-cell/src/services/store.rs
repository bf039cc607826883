use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::models::AuthError;

/// Outcome of checking a submitted code against the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    /// Codes matched and the entry is gone.
    Consumed,
    /// A live entry exists but holds a different code. The entry is kept.
    Mismatch,
    Missing,
}

/// Key-value storage for pending one-time codes. Entries vanish once their TTL elapses.
#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn put(&self, key: &str, code: &str, ttl: Duration) -> Result<(), AuthError>;
    /// The live code under `key`, or `None` if it was never set or has expired.
    async fn get(&self, key: &str) -> Result<Option<String>, AuthError>;
    /// Compares and deletes in one step, so two callers can never both consume a code.
    async fn consume(&self, key: &str, code: &str) -> Result<CodeCheck, AuthError>;
}

struct PendingCode {
    code: String,
    expires_at: Instant,
}

/// Process-local store. Expired entries are dropped on read and swept on every write.
#[derive(Default)]
pub struct MemoryOtpStore {
    codes: RwLock<HashMap<String, PendingCode>>,
}

impl MemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn put(&self, key: &str, code: &str, ttl: Duration) -> Result<(), AuthError> {
        let now = Instant::now();
        let mut codes = self.codes.write().await;
        codes.retain(|_, pending| pending.expires_at > now);
        codes.insert(
            key.to_string(),
            PendingCode {
                code: code.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let mut codes = self.codes.write().await;
        match codes.get(key) {
            Some(pending) if pending.expires_at > Instant::now() => Ok(Some(pending.code.clone())),
            Some(_) => {
                debug!("Dropping expired code for {}", key);
                codes.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn consume(&self, key: &str, code: &str) -> Result<CodeCheck, AuthError> {
        let mut codes = self.codes.write().await;
        let check = match codes.get(key) {
            Some(pending) if pending.expires_at <= Instant::now() => CodeCheck::Missing,
            Some(pending) if pending.code == code => CodeCheck::Consumed,
            Some(_) => return Ok(CodeCheck::Mismatch),
            None => return Ok(CodeCheck::Missing),
        };
        codes.remove(key);
        Ok(check)
    }
}

// 1 = consumed, 2 = mismatch, 0 = missing
const CONSUME_SCRIPT: &str = r#"
local stored = redis.call('GET', KEYS[1])
if not stored then return 0 end
if stored == ARGV[1] then
  redis.call('DEL', KEYS[1])
  return 1
end
return 2
"#;

/// Redis-backed store shared by every API instance. Redis enforces the TTL.
pub struct RedisOtpStore {
    pool: Pool,
}

impl RedisOtpStore {
    pub async fn connect(redis_url: &str) -> Result<Self, AuthError> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| AuthError::OtpStore(format!("Pool creation error: {}", e)))?;

        let store = Self { pool };
        let mut conn = store.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        info!("Connected to Redis OTP store");
        Ok(store)
    }

    async fn connection(&self) -> Result<Connection, AuthError> {
        self.pool
            .get()
            .await
            .map_err(|e| AuthError::OtpStore(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn put(&self, key: &str, code: &str, ttl: Duration) -> Result<(), AuthError> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(code)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let mut conn = self.connection().await?;
        let code: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(code)
    }

    async fn consume(&self, key: &str, code: &str) -> Result<CodeCheck, AuthError> {
        let mut conn = self.connection().await?;
        let outcome: i64 = redis::Script::new(CONSUME_SCRIPT)
            .key(key)
            .arg(code)
            .invoke_async(&mut conn)
            .await?;
        Ok(match outcome {
            1 => CodeCheck::Consumed,
            2 => CodeCheck::Mismatch,
            _ => CodeCheck::Missing,
        })
    }
}
