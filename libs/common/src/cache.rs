//! Local read-through cache for the access-control client
//!
//! This module keeps recently fetched lists in device storage with a fixed
//! time-to-live, so first-page reads can skip the network and a list can
//! still be shown when the backend is unreachable.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::StorageResult;
use crate::storage::{ACCESS_RECORDS_CACHE_KEY, CARDS_CACHE_KEY, KeyValueStore};

/// Configuration for cache lifetimes
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of the cached access history (default: 5 minutes)
    pub history_ttl: Duration,
    /// Lifetime of the cached card list (default: 2 minutes)
    pub cards_ttl: Duration,
    /// Lifetime for any other key (default: 5 minutes)
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            history_ttl: Duration::from_secs(5 * 60),
            cards_ttl: Duration::from_secs(2 * 60),
            default_ttl: Duration::from_secs(5 * 60),
        }
    }
}

impl CacheConfig {
    /// Lifetime that applies to `key`
    pub fn ttl_for(&self, key: &str) -> Duration {
        match key {
            ACCESS_RECORDS_CACHE_KEY => self.history_ttl,
            CARDS_CACHE_KEY => self.cards_ttl,
            _ => self.default_ttl,
        }
    }
}

/// Stored form of a cache entry
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    data: T,
    /// Unix time in milliseconds when the entry was written
    timestamp: i64,
}

/// Cache over a shared key-value store
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl LocalCache {
    /// Create a cache using the system clock
    pub fn new(store: Arc<dyn KeyValueStore>, config: CacheConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    /// Create a cache with an explicit clock
    pub fn with_clock(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: CacheConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Get a cached value if present and still fresh.
    ///
    /// Stale or unreadable entries are evicted and reported as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding unreadable cache entry {}: {}", key, e);
                self.store.remove(key)?;
                return Ok(None);
            }
        };

        let age_ms = self.clock.now().timestamp_millis() - entry.timestamp;
        let ttl_ms = self.config.ttl_for(key).as_millis() as i64;
        if age_ms > ttl_ms {
            debug!("Cache entry {} expired ({} ms old)", key, age_ms);
            self.store.remove(key)?;
            return Ok(None);
        }

        Ok(Some(entry.data))
    }

    /// Overwrite the entry with fresh data stamped with the current time
    pub fn set<T: Serialize>(&self, key: &str, data: &T) -> StorageResult<()> {
        let entry = CacheEntry {
            data,
            timestamp: self.clock.now().timestamp_millis(),
        };
        let raw = serde_json::to_string(&entry)?;
        self.store.set(key, &raw)
    }

    /// Drop the entry
    pub fn invalidate(&self, key: &str) -> StorageResult<()> {
        debug!("Invalidating cache entry {}", key);
        self.store.remove(key)
    }

    /// Cache lifetimes in use
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}
