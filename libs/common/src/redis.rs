//! Redis client module with connection pooling
//!
//! Provides a minimal async Redis client with only the commands the
//! services actually use: plain key/value with TTL for the cache layer,
//! KEYS/DEL for pattern invalidation, and LPUSH/BRPOP for the command
//! queue channels.

use anyhow::{Context, Result};
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;

/// Redis connection pool configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections
    pub min_idle: Option<u32>,
    /// Connection timeout in seconds
    pub connection_timeout: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            max_connections: 20,
            min_idle: Some(2),
            connection_timeout: 5,
        }
    }
}

impl RedisConfig {
    /// Create config from URL with default pool settings
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Redis asynchronous client with connection pooling
pub struct RedisClient {
    pool: Arc<Pool<RedisConnectionManager>>,
    url: String,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("url", &self.url)
            .field("pool_state", &self.pool.state())
            .finish()
    }
}

impl RedisClient {
    /// Create a new client with default configuration
    pub async fn new(url: &str) -> Result<Self> {
        Self::with_config(RedisConfig::from_url(url)).await
    }

    /// Create a new client with custom configuration
    pub async fn with_config(config: RedisConfig) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .context("Failed to create Redis connection manager")?;

        let mut pool_builder = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_secs(config.connection_timeout));

        if let Some(min_idle) = config.min_idle {
            pool_builder = pool_builder.min_idle(Some(min_idle));
        }

        let pool = pool_builder
            .build(manager)
            .await
            .context("Failed to build Redis connection pool")?;

        let pool = Arc::new(pool);

        // Test the connection
        {
            let mut conn = pool
                .get()
                .await
                .context("Failed to get connection from pool for testing")?;
            let _: String = redis::cmd("PING")
                .query_async(&mut *conn)
                .await
                .context("Failed to ping Redis server")?;
        }

        Ok(Self {
            pool,
            url: config.url,
        })
    }

    /// Get a connection from the pool
    pub async fn get_connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>> {
        self.pool
            .get()
            .await
            .context("Failed to get connection from pool")
    }

    /// GET operation
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_connection().await?;
        conn.get(key)
            .await
            .with_context(|| format!("Failed to GET key: {}", key))
    }

    /// SET with expiry in seconds
    pub async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.get_connection().await?;
        conn.set_ex(key, value, ttl_secs)
            .await
            .with_context(|| format!("Failed to SETEX key: {}", key))
    }

    /// DEL a single key
    pub async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let _: u64 = conn
            .del(key)
            .await
            .with_context(|| format!("Failed to DEL key: {}", key))?;
        Ok(())
    }

    /// DEL multiple keys at once
    pub async fn del_many(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.get_connection().await?;
        conn.del(keys)
            .await
            .context("Failed to DEL multiple keys")
    }

    /// KEYS pattern scan
    ///
    /// The cached parameter combinations are unbounded and not individually
    /// trackable, so bulk invalidation goes through a pattern match.
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.get_connection().await?;
        conn.keys(pattern)
            .await
            .with_context(|| format!("Failed to KEYS pattern: {}", pattern))
    }

    /// LPUSH a value onto a list
    pub async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let _: u64 = conn
            .lpush(key, value)
            .await
            .with_context(|| format!("Failed to LPUSH to: {}", key))?;
        Ok(())
    }

    /// RPOP a single value; returns None when the list is empty
    pub async fn rpop(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_connection().await?;
        conn.rpop(key, None)
            .await
            .with_context(|| format!("Failed to RPOP from: {}", key))
    }

    /// BRPOP with timeout; returns None when the timeout elapses
    pub async fn brpop(&self, key: &str, timeout_secs: f64) -> Result<Option<String>> {
        let mut conn = self.get_connection().await?;
        let popped: Option<(String, String)> = conn
            .brpop(key, timeout_secs)
            .await
            .with_context(|| format!("Failed to BRPOP from: {}", key))?;
        Ok(popped.map(|(_, value)| value))
    }

    /// PING the server
    pub async fn ping(&self) -> Result<String> {
        let mut conn = self.get_connection().await?;
        redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .context("Failed to ping Redis server")
    }
}
