//! Process-local TTL cache shared by every tool of every client.
//!
//! Values are stored as JSON so one cache can hold any serializable type. The
//! cache is a request-deduplication optimization only: `get`/`set` pairs are not
//! atomic, and concurrent writers to the same key resolve as last-write-wins.
//!
//! When disabled, every operation is a no-op that returns the empty value for
//! that operation (`None`, `false`, `0`). A zero TTL stores entries without
//! expiry, as does a TTL too large to represent as a deadline.

use std::time::Duration;

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::core::config::CacheConfig;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    /// `None` never expires
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

pub struct ToolCache {
    entries: DashMap<String, CacheEntry>,
    enabled: bool,
    ttl: Duration,
}

impl ToolCache {
    pub fn new(enabled: bool, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            enabled,
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.enabled, Duration::from_secs(config.ttl_seconds))
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(false, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read a value. Expired entries are evicted on the way out.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let now = Instant::now();
        let value = {
            let entry = self.entries.get(key)?;
            if entry.is_expired(now) {
                None
            } else {
                Some(entry.value.clone())
            }
        };

        let Some(value) = value else {
            self.entries.remove_if(key, |_, e| e.is_expired(now));
            debug!(key, "cache entry expired");
            return None;
        };

        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "cached value has unexpected shape, ignoring");
                None
            }
        }
    }

    /// Store a value with the configured TTL. Returns `false` when disabled or
    /// when the value cannot be serialized.
    pub fn set<T: Serialize>(&self, key: impl Into<String>, value: &T) -> bool {
        if !self.enabled {
            return false;
        }

        let key = key.into();
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to serialize value for cache");
                return false;
            }
        };

        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: self.deadline(Instant::now()),
            },
        );
        true
    }

    fn deadline(&self, now: Instant) -> Option<Instant> {
        if self.ttl.is_zero() {
            return None;
        }
        now.checked_add(self.ttl)
    }

    /// Remove a key. Returns the number of entries removed.
    pub fn del(&self, key: &str) -> usize {
        if !self.enabled {
            return 0;
        }
        usize::from(self.entries.remove(key).is_some())
    }

    pub fn flush_all(&self) {
        if self.enabled {
            self.entries.clear();
        }
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ToolCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
