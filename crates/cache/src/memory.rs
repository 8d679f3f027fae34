use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courtside_models::Result;
use dashmap::DashMap;
use serde_json::Value;

use crate::StatsCache;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: DateTime<Utc>,
}

/// Entries held before a write sweeps out expired ones.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Process-local cache. Expired entries are dropped on read, and swept on
/// write once the cache is full; if nothing has expired the entry closest
/// to expiry is evicted.
#[derive(Debug)]
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
    max_entries: usize,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    fn make_room(&self, key: &str, now: DateTime<Utc>) {
        if self.entries.len() < self.max_entries || self.entries.contains_key(key) {
            return;
        }
        self.entries.retain(|_, entry| entry.expires_at > now);
        if self.entries.len() < self.max_entries {
            return;
        }
        let soonest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.expires_at)
            .map(|entry| entry.key().clone());
        if let Some(victim) = soonest {
            self.entries.remove(&victim);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl StatsCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = Utc::now();
        let hit = self.entries.get(key).map(|e| e.value().clone());
        match hit {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value)),
            Some(_) => {
                self.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365));
        let now = Utc::now();
        self.make_room(key, now);
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
