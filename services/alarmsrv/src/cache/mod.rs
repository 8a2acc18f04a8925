//! Cache layer for list/detail reads
//!
//! Serialized response payloads keyed by entity id or by a deterministic
//! fingerprint of the normalized query parameters. Every entry carries the
//! same short TTL, so worst-case staleness after a missed invalidation is
//! bounded. The cache is an injected collaborator ([`CacheClient`]), never
//! ambient state.

pub mod invalidation;
pub mod keys;

pub use invalidation::CacheInvalidator;

use anyhow::Result;
use async_trait::async_trait;
use common::RedisClient;
use std::sync::Arc;

/// Key-value cache with TTL and pattern-based bulk deletion
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Fetch a cached payload; `None` is a miss
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a payload with a TTL in seconds
    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// Drop a single key
    async fn forget(&self, key: &str) -> Result<()>;

    /// Drop every key matching the glob pattern; returns how many went.
    /// Needed because the cached parameter combinations are unbounded and
    /// not individually trackable.
    async fn forget_matching(&self, pattern: &str) -> Result<u64>;
}

/// Redis-backed cache
pub struct RedisCache {
    client: Arc<RedisClient>,
}

impl RedisCache {
    pub fn new(client: Arc<RedisClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CacheClient for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.client.get(key).await
    }

    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.client.set_ex(key, value, ttl_secs).await
    }

    async fn forget(&self, key: &str) -> Result<()> {
        self.client.del(key).await
    }

    async fn forget_matching(&self, pattern: &str) -> Result<u64> {
        let keys = self.client.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        self.client.del_many(&keys).await
    }
}
