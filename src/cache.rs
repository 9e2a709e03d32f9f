// src/cache.rs
//! Provides a Redis-based caching layer for pull-request snapshots.

use crate::error::{FeedError, Result, RetryPolicy};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use redis::{aio::ConnectionManager, AsyncCommands};
use std::fmt;
use tokio::sync::Mutex;

const LIVENESS_PROBE_KEY: &str = "livenessProbe";
const LIVENESS_PROBE_TTL_SECS: u64 = 30;

/// Key/value store with per-key expiry, abstracting the cache backend so
/// the read and refresh paths can be exercised against an in-memory fake.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;
    /// Real SET+GET round trip against the backend, so a store that is
    /// connected but non-functional still reports unhealthy.
    async fn ping(&self) -> Result<bool>;
}

/// Redis-backed store. The underlying `ConnectionManager` is established
/// lazily on first use, released explicitly via [`RedisCache::close`], and
/// re-established transparently on the next operation after a close.
pub struct RedisCache {
    redis_url: String,
    retry: RetryPolicy,
    conn: Mutex<Option<ConnectionManager>>,
}

// Manual Debug implementation; ConnectionManager is not Debug.
impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("redis_url", &self.redis_url)
            .field("retry", &self.retry)
            .field("conn", &"<ConnectionManager handle>")
            .finish()
    }
}

impl RedisCache {
    pub fn new(redis_url: &str, retry: RetryPolicy) -> Self {
        Self {
            redis_url: redis_url.to_string(),
            retry,
            conn: Mutex::new(None),
        }
    }

    /// Returns the shared connection, establishing it under the retry
    /// policy if this is the first use (or the handle was closed).
    async fn connection(&self) -> Result<ConnectionManager> {
        let mut guard = self.conn.lock().await;
        if let Some(manager) = guard.as_ref() {
            return Ok(manager.clone());
        }

        info!("Connecting to Redis at {}", self.redis_url);
        let client = redis::Client::open(self.redis_url.as_str())?;
        let manager = self
            .retry
            .execute(|| ConnectionManager::new(client.clone()))
            .await
            .map_err(|e| {
                error!("Giving up on Redis connection to {}: {}", self.redis_url, e);
                e
            })?;
        info!("Redis ConnectionManager established");

        *guard = Some(manager.clone());
        Ok(manager)
    }

    /// Releases the shared connection. The next cache operation reconnects.
    pub async fn close(&self) {
        let mut guard = self.conn.lock().await;
        if guard.take().is_some() {
            info!("Redis connection released");
        }
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(value)) => {
                debug!("Cache HIT for key: {}", key);
                Ok(Some(value))
            }
            Ok(None) => {
                debug!("Cache MISS for key: {}", key);
                Ok(None)
            }
            Err(e) => {
                error!("Redis GET error for key {}: {}", key, e);
                Err(FeedError::Cache(format!(
                    "Redis GET error for key {}: {}",
                    key, e
                )))
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.connection().await?;
        match conn.set_ex::<_, _, ()>(key, value, ttl_secs).await {
            Ok(_) => {
                debug!("Cache SETEX success for key: {} with TTL: {}s", key, ttl_secs);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to SETEX key '{}' in Redis: {}", key, e);
                Err(FeedError::Cache(format!(
                    "Redis SETEX error for key {}: {}",
                    key, e
                )))
            }
        }
    }

    async fn ping(&self) -> Result<bool> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(LIVENESS_PROBE_KEY, "ok", LIVENESS_PROBE_TTL_SECS)
            .await
            .map_err(|e| FeedError::Cache(format!("Liveness probe write failed: {}", e)))?;
        let value: Option<String> = conn
            .get(LIVENESS_PROBE_KEY)
            .await
            .map_err(|e| FeedError::Cache(format!("Liveness probe read failed: {}", e)))?;
        Ok(value.as_deref() == Some("ok"))
    }
}
