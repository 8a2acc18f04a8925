//! Cache invalidation
//!
//! First-class component consumed by both the controller layer (proactive
//! invalidation at accept time) and the command workers (after commit).
//! Invalidation failures are soft: staleness is bounded by the entry TTL,
//! so they are logged and swallowed rather than surfaced.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{keys, CacheClient};

#[derive(Clone)]
pub struct CacheInvalidator {
    cache: Arc<dyn CacheClient>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<dyn CacheClient>) -> Self {
        Self { cache }
    }

    /// An alarm was (or is about to be) created, updated or deleted.
    /// Clears the stats key, the entity key when known, and every
    /// collection key.
    pub async fn alarms_changed(&self, id: Option<i64>) {
        self.forget(keys::ALARM_STATS_KEY).await;
        if let Some(id) = id {
            self.forget(&keys::alarm_entity(id)).await;
        }
        match self.cache.forget_matching(keys::ALARM_COLLECTION_PATTERN).await {
            Ok(count) => debug!("Invalidated {} alarm collection cache entries", count),
            Err(e) => warn!("Failed to invalidate alarm collection caches: {}", e),
        }
    }

    /// An alarm mutation that also resolved a free-text type name, which
    /// may have materialized a new type row. Clears the type listing on
    /// top of the alarm keys; entity keys for pre-existing types are
    /// untouched.
    pub async fn alarms_and_types_changed(&self, alarm_id: Option<i64>) {
        self.forget(keys::TYPE_LIST_KEY).await;
        self.alarms_changed(alarm_id).await;
    }

    /// An alarm type changed. Alarm payloads embed type data, so this
    /// cascades into the alarm caches as well.
    pub async fn types_changed(&self, id: Option<i64>) {
        self.forget(keys::TYPE_LIST_KEY).await;
        if let Some(id) = id {
            self.forget(&keys::type_entity(id)).await;
        }
        self.alarms_changed(None).await;
    }

    async fn forget(&self, key: &str) {
        if let Err(e) = self.cache.forget(key).await {
            warn!("Failed to invalidate cache key {}: {}", key, e);
        }
    }
}
