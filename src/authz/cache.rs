use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use super::mask::PermissionFlags;
use super::principal::PermissionRequest;
use super::store::Clock;

/// Default lifetime of a cached decision.
pub const DEFAULT_DECISION_TTL_SECS: i64 = 300;

/// Expired entries for every key are swept once per this many inserts.
pub const SWEEP_EVERY_STORES: usize = 64;

/// Composite cache key. Built from the request's fields, never from a hash of
/// the request object itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecisionKey {
    pub user_id: i64,
    pub resource_id: i64,
    pub requested: PermissionFlags,
}

impl DecisionKey {
    pub fn new(user_id: i64, resource_id: i64, requested: PermissionFlags) -> Self {
        Self {
            user_id,
            resource_id,
            requested,
        }
    }

    /// Same user and capability against another resource.
    pub fn for_resource(&self, resource_id: i64) -> Self {
        Self {
            resource_id,
            ..*self
        }
    }
}

impl From<&PermissionRequest> for DecisionKey {
    fn from(request: &PermissionRequest) -> Self {
        Self::new(request.user_id, request.resource_id, request.requested)
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedDecision {
    authorized: bool,
    expires_at: DateTime<Utc>,
}

impl CachedDecision {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Process-local memo of authorization decisions with a fixed time window.
///
/// All check-then-write sequences happen under a single lock acquisition, so two
/// concurrent misses for the same key cannot both insert.
pub struct DecisionCache {
    entries: Mutex<HashMap<DecisionKey, CachedDecision>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    stores_since_sweep: AtomicUsize,
}

impl DecisionCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
            stores_since_sweep: AtomicUsize::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live decision for `key`. A stale entry is removed and reported as a miss.
    pub fn lookup(&self, key: &DecisionKey) -> Option<bool> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.authorized),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert unless a live entry already exists. Returns whether this call wrote.
    pub fn store(&self, key: DecisionKey, authorized: bool) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        if entries.get(&key).is_some_and(|entry| entry.is_live(now)) {
            return false;
        }

        if self.stores_since_sweep.fetch_add(1, Ordering::Relaxed) + 1 >= SWEEP_EVERY_STORES {
            self.stores_since_sweep.store(0, Ordering::Relaxed);
            let before = entries.len();
            entries.retain(|_, entry| entry.is_live(now));
            tracing::trace!(swept = before - entries.len(), "decision cache swept");
        }

        entries.insert(
            key,
            CachedDecision {
                authorized,
                expires_at: now + self.ttl,
            },
        );
        true
    }

    pub fn evict(&self, key: &DecisionKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Number of entries that would still be served by `lookup`.
    pub fn live_len(&self) -> usize {
        let now = self.clock.now();
        self.entries.lock().values().filter(|entry| entry.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for DecisionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionCache")
            .field("entries", &self.len())
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::fixtures::ManualClock;

    fn cache_with_clock() -> (DecisionCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = DecisionCache::new(Duration::seconds(DEFAULT_DECISION_TTL_SECS), clock.clone());
        (cache, clock)
    }

    fn key(resource_id: i64) -> DecisionKey {
        DecisionKey::new(1, resource_id, PermissionFlags::READ)
    }

    #[test]
    fn test_lookup_miss_then_hit() {
        let (cache, _clock) = cache_with_clock();
        assert_eq!(cache.lookup(&key(10)), None);

        assert!(cache.store(key(10), true));
        assert_eq!(cache.lookup(&key(10)), Some(true));
    }

    #[test]
    fn test_keys_differ_by_every_field() {
        let (cache, _clock) = cache_with_clock();
        cache.store(DecisionKey::new(1, 10, PermissionFlags::READ), true);

        assert_eq!(cache.lookup(&DecisionKey::new(2, 10, PermissionFlags::READ)), None);
        assert_eq!(cache.lookup(&DecisionKey::new(1, 11, PermissionFlags::READ)), None);
        assert_eq!(cache.lookup(&DecisionKey::new(1, 10, PermissionFlags::WRITE)), None);
    }

    #[test]
    fn test_first_write_wins_within_window() {
        let (cache, _clock) = cache_with_clock();
        assert!(cache.store(key(10), false));
        assert!(!cache.store(key(10), true));
        assert_eq!(cache.lookup(&key(10)), Some(false));
    }

    #[test]
    fn test_expired_entry_is_evicted_on_lookup() {
        let (cache, clock) = cache_with_clock();
        cache.store(key(10), true);

        clock.advance(Duration::seconds(DEFAULT_DECISION_TTL_SECS - 1));
        assert_eq!(cache.lookup(&key(10)), Some(true));

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.lookup(&key(10)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_store_replaces_stale_entry() {
        let (cache, clock) = cache_with_clock();
        cache.store(key(10), false);
        clock.advance(Duration::seconds(DEFAULT_DECISION_TTL_SECS + 1));

        assert!(cache.store(key(10), true));
        assert_eq!(cache.lookup(&key(10)), Some(true));
    }

    #[test]
    fn test_evict_clear_and_purge() {
        let (cache, clock) = cache_with_clock();
        cache.store(key(1), true);
        cache.store(key(2), true);

        assert!(cache.evict(&key(1)));
        assert!(!cache.evict(&key(1)));
        assert_eq!(cache.len(), 1);

        clock.advance(Duration::seconds(DEFAULT_DECISION_TTL_SECS));
        cache.store(key(3), false);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stores_sweep_expired_entries_for_other_keys() {
        let (cache, clock) = cache_with_clock();
        for resource_id in 0..1000 {
            cache.store(key(resource_id), true);
        }

        clock.advance(Duration::hours(24));
        assert_eq!(cache.live_len(), 0);

        for resource_id in 1000..1000 + SWEEP_EVERY_STORES as i64 {
            cache.store(key(resource_id), false);
        }
        assert_eq!(cache.len(), SWEEP_EVERY_STORES);
        assert_eq!(cache.live_len(), SWEEP_EVERY_STORES);
    }

    #[test]
    fn test_concurrent_stores_insert_once() {
        let (cache, _clock) = cache_with_clock();
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.store(key(99), i % 2 == 0))
            })
            .collect();

        let writes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|wrote| *wrote)
            .count();
        assert_eq!(writes, 1);
    }
}
