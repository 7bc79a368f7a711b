//! Generic TTL cache.

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, PoisonError, RwLock};

use super::Clock;

#[derive(Debug, Clone)]
struct CacheItem<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Bounded map whose entries expire after a time-to-live.
///
/// Backed by an LRU list capped at `capacity`. Reads peek under a shared lock
/// and never reorder, so the list tail is the oldest write. Every write first
/// drops expired entries from the tail; a full cache evicts its oldest entry.
pub struct TtlCache<K, V> {
    items: RwLock<LruCache<K, CacheItem<V>>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: NonZeroUsize, default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            items: RwLock::new(LruCache::new(capacity)),
            default_ttl,
            clock,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn capacity(&self) -> usize {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .cap()
            .get()
    }

    /// Get a live entry.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        items
            .peek(key)
            .filter(|item| item.expires_at > now)
            .map(|item| item.value.clone())
    }

    /// Insert with the default TTL.
    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let now = self.clock.now();
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        evict_expired(&mut items, now);
        items.put(
            key,
            CacheItem {
                value,
                expires_at: expiry(now, ttl),
            },
        );
    }

    /// Return the live entry, or compute, store and return a new one.
    ///
    /// `init` runs outside the lock; two racing callers may both compute, and
    /// the first stored value wins.
    pub fn get_or_insert_with<F>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }

        let value = init();
        let now = self.clock.now();
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = items.peek(&key).filter(|item| item.expires_at > now) {
            return existing.value.clone();
        }
        evict_expired(&mut items, now);
        items.put(
            key,
            CacheItem {
                value: value.clone(),
                expires_at: expiry(now, self.default_ttl),
            },
        );
        value
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.pop(key).map(|item| item.value)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let expired: Vec<K> = items
            .iter()
            .filter(|(_, item)| item.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            items.pop(key);
        }
        expired.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Pop expired entries off the oldest end until a live one is reached.
fn evict_expired<K: Eq + Hash, V>(items: &mut LruCache<K, CacheItem<V>>, now: DateTime<Utc>) {
    while items
        .peek_lru()
        .is_some_and(|(_, item)| item.expires_at <= now)
    {
        items.pop_lru();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn cache_with_clock(ttl_secs: i64) -> (TtlCache<String, u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = TtlCache::new(
            NonZeroUsize::new(16).unwrap(),
            Duration::seconds(ttl_secs),
            clock.clone(),
        );
        (cache, clock)
    }

    #[test]
    fn test_get_returns_live_entry() {
        let (cache, _clock) = cache_with_clock(60);
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"b".to_string()), None);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (cache, clock) = cache_with_clock(60);
        cache.insert("a".to_string(), 1);

        clock.advance(Duration::seconds(59));
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn test_custom_ttl_overrides_default() {
        let (cache, clock) = cache_with_clock(60);
        cache.insert_with_ttl("short".to_string(), 7, Duration::seconds(5));
        clock.advance(Duration::seconds(6));
        assert_eq!(cache.get(&"short".to_string()), None);
    }

    #[test]
    fn test_get_or_insert_with_only_computes_once() {
        let (cache, _clock) = cache_with_clock(60);
        let mut calls = 0;
        let first = cache.get_or_insert_with("k".to_string(), || {
            calls += 1;
            10
        });
        let second = cache.get_or_insert_with("k".to_string(), || 20);
        assert_eq!(first, 10);
        assert_eq!(second, 10);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_get_or_insert_with_recomputes_after_expiry() {
        let (cache, clock) = cache_with_clock(60);
        cache.get_or_insert_with("k".to_string(), || 1);
        clock.advance(Duration::seconds(120));
        assert_eq!(cache.get_or_insert_with("k".to_string(), || 2), 2);
    }

    #[test]
    fn test_purge_expired() {
        let (cache, clock) = cache_with_clock(60);
        cache.insert("old".to_string(), 1);
        clock.advance(Duration::seconds(30));
        cache.insert("new".to_string(), 2);
        clock.advance(Duration::seconds(31));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"new".to_string()), Some(2));
    }

    #[test]
    fn test_remove() {
        let (cache, _clock) = cache_with_clock(60);
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.remove(&"a".to_string()), Some(1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entries_dropped_on_insert() {
        let clock = Arc::new(ManualClock::default());
        let cache = TtlCache::new(
            NonZeroUsize::new(10_000).unwrap(),
            Duration::minutes(15),
            clock.clone(),
        );
        for i in 0..5000 {
            cache.insert(format!("Show.S01E{:04}.1080p.WEB-DL", i), i);
        }
        assert_eq!(cache.len(), 5000);

        clock.advance(Duration::hours(24));
        for i in 0..10 {
            cache.get_or_insert_with(format!("Movie.{}.2160p.BluRay", i), || i);
        }
        assert_eq!(cache.len(), 10);
    }

    #[test]
    fn test_capacity_bounds_live_entries() {
        let clock = Arc::new(ManualClock::default());
        let cache = TtlCache::new(NonZeroUsize::new(3).unwrap(), Duration::minutes(15), clock);
        for i in 0..10u32 {
            cache.insert(i.to_string(), i);
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.capacity(), 3);
        assert_eq!(cache.get(&"0".to_string()), None);
        assert_eq!(cache.get(&"9".to_string()), Some(9));
    }
}
