// Bounded, time-expiring cache for third-party lookups

use crate::models::DexQuote;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// LRU keyed by address; entries older than `ttl` count as misses and are
/// dropped on access.
pub struct TtlCache<V> {
    entries: LruCache<String, (Instant, V)>,
    ttl: Duration,
}

/// DexScreener quotes by token address. `None` records a lookup that found
/// no pairs so it is not repeated within the TTL.
pub type QuoteCache = TtlCache<Option<DexQuote>>;

impl<V: Clone> TtlCache<V> {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: LruCache::new(capacity),
            ttl,
        }
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&mut self, key: &str, now: Instant) -> Option<V> {
        let fresh = match self.entries.get(key) {
            Some((stored_at, value)) if now.saturating_duration_since(*stored_at) < self.ttl => {
                Some(value.clone())
            }
            Some(_) => None,
            None => return None,
        };
        if fresh.is_none() {
            self.entries.pop(key);
        }
        fresh
    }

    pub fn insert(&mut self, key: String, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&mut self, key: String, value: V, at: Instant) {
        self.entries.put(key, (at, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
