// SPDX-License-Identifier: Apache-2.0

//! Freshness cache for policy-cleared connector results.
//!
//! Bounded LRU with an absolute TTL. Whether a hit is fresh enough for a
//! given request is decided against the caller's staleness budget, which is
//! independent of (and usually tighter than) the TTL.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::engine::types::Row;

/// Default maximum number of cached entries.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default absolute time-to-live of an entry.
pub const DEFAULT_TTL: Duration = Duration::from_millis(30_000);

/// Cache key. The tenant is part of the key so rows cleared for one
/// tenant are never served to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub tenant_id: String,
    pub source: String,
    pub fingerprint: String,
}

impl CacheKey {
    pub fn new(
        tenant_id: impl Into<String>,
        source: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            source: source.into(),
            fingerprint: fingerprint.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub rows: Arc<Vec<Row>>,
    pub fetched_at: Instant,
}

impl CacheEntry {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }

    pub fn age_ms(&self, now: Instant) -> u64 {
        u64::try_from(self.age(now).as_millis()).unwrap_or(u64::MAX)
    }
}

/// A cache hit that satisfied a staleness budget.
#[derive(Debug, Clone)]
pub struct FreshHit {
    pub rows: Arc<Vec<Row>>,
    pub age_ms: u64,
}

pub struct FreshnessCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl FreshnessCache {
    /// A zero `max_entries` is bumped to 1.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the entry for `key` unless it is past its TTL.
    ///
    /// Expired entries are evicted on the way out. A hit refreshes the
    /// entry's LRU position.
    pub fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.lookup_at(key, Instant::now())
    }

    pub fn lookup_at(&self, key: &CacheKey, now: Instant) -> Option<CacheEntry> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) => entry.age(now) > self.ttl,
            None => return None,
        };
        if expired {
            entries.pop(key);
            return None;
        }
        entries.get(key).cloned()
    }

    /// Returns the cached rows if they are at most `max_staleness_ms` old.
    ///
    /// A hit that is too stale for this caller stays cached for others.
    pub fn lookup_fresh(&self, key: &CacheKey, max_staleness_ms: u64) -> Option<FreshHit> {
        let now = Instant::now();
        let entry = self.lookup_at(key, now)?;
        let age_ms = entry.age_ms(now);
        (age_ms <= max_staleness_ms).then(|| FreshHit {
            rows: entry.rows,
            age_ms,
        })
    }

    pub fn store(&self, key: CacheKey, rows: Arc<Vec<Row>>) {
        self.store_at(key, rows, Instant::now());
    }

    pub fn store_at(&self, key: CacheKey, rows: Arc<Vec<Row>>, fetched_at: Instant) {
        self.entries.lock().put(key, CacheEntry { rows, fetched_at });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FreshnessCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }
}
