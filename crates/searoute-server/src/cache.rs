//! Read-through cache for current segment versions.

use dashmap::DashMap;
use searoute_core::segment::SegmentRecord;
use std::hash::Hash;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Cache failures are never fatal; callers log and fall back to storage.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Cache key for a segment's current version.
pub fn segment_cache_key(segment_id: &str) -> String {
    format!("segment:{}", segment_id)
}

pub trait SegmentCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<SegmentRecord>, CacheError>;
    fn put(&self, key: &str, record: SegmentRecord) -> Result<(), CacheError>;
    fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    /// Drop stale entries. Backends with their own expiry need not override.
    fn prune(&self) {}
}

pub trait CacheEntry {
    fn fetched_at(&self) -> Instant;
}

pub fn prune_cache<K, V>(cache: &DashMap<K, V>, max_entries: usize, max_age: Duration)
where
    K: Clone + Eq + Hash,
    V: CacheEntry,
{
    let now = Instant::now();
    let mut entries: Vec<(K, Instant)> = cache
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().fetched_at()))
        .collect();

    entries.retain(|(key, fetched_at)| {
        let expired = now.duration_since(*fetched_at) > max_age;
        if expired {
            cache.remove(key);
        }
        !expired
    });

    if cache.len() <= max_entries {
        return;
    }

    // oldest first
    entries.sort_by_key(|(_, fetched_at)| *fetched_at);
    for (key, _) in entries {
        if cache.len() <= max_entries {
            break;
        }
        cache.remove(&key);
    }
}

struct CachedSegment {
    record: SegmentRecord,
    fetched_at: Instant,
}

impl CacheEntry for CachedSegment {
    fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

/// In-process TTL cache.
pub struct MemoryCache {
    entries: DashMap<String, CachedSegment>,
    ttl: Duration,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SegmentCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<SegmentRecord>, CacheError> {
        let fresh = self.entries.get(key).and_then(|entry| {
            (entry.fetched_at.elapsed() <= self.ttl).then(|| entry.record.clone())
        });
        if fresh.is_none() {
            self.entries.remove(key);
        }
        Ok(fresh)
    }

    fn put(&self, key: &str, record: SegmentRecord) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            CachedSegment {
                record,
                fetched_at: Instant::now(),
            },
        );
        if self.entries.len() > self.max_entries {
            prune_cache(&self.entries, self.max_entries, self.ttl);
        }
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    fn prune(&self) {
        prune_cache(&self.entries, self.max_entries, self.ttl);
    }
}
