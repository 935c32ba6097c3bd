//! In-memory virtual attribute cache with TTL and capacity bounds.
//!
//! Virtual attribute values live on external resources; this cache keeps
//! recently resolved values so repeated mappings within the TTL avoid a
//! remote fetch.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use idlink_core::{IdentityId, IdentityKind};

/// Cache key: one virtual attribute of one identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirAttrCacheKey {
    pub kind: IdentityKind,
    pub id: IdentityId,
    pub attr: String,
}

impl VirAttrCacheKey {
    #[must_use]
    pub fn new(kind: IdentityKind, id: IdentityId, attr: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            attr: attr.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    /// Shared so readers never hold the lock while using the values.
    values: Arc<Vec<String>>,
    created: DateTime<Utc>,
    last_access: DateTime<Utc>,
    force_expired: bool,
}

/// Cache statistics for health reporting.
#[derive(Debug, Clone)]
pub struct VirAttrCacheStats {
    /// Total number of cached entries.
    pub total_count: usize,
    /// Number of expired entries still in cache.
    pub expired_count: usize,
}

/// TTL and capacity bounded cache of virtual attribute values.
///
/// All mutation happens under one mutex; reads clone an `Arc` out and
/// release the lock immediately. When the capacity is reached, expired
/// entries are dropped first; only if none are expired does the
/// least-recently-accessed live entry get evicted.
#[derive(Debug)]
pub struct VirAttrCache {
    entries: Mutex<HashMap<VirAttrCacheKey, CacheEntry>>,
    capacity: usize,
    ttl: Duration,
}

impl VirAttrCache {
    /// Create a cache holding at most `capacity` entries, each valid for
    /// `ttl_seconds` after insertion.
    #[must_use]
    pub fn new(capacity: usize, ttl_seconds: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl: Duration::seconds(ttl_seconds as i64),
        }
    }

    /// Look up cached values. Expired or force-expired entries read as
    /// absent. A live read refreshes the entry's access time.
    pub fn get(&self, key: &VirAttrCacheKey) -> Option<Arc<Vec<String>>> {
        let now = Utc::now();
        let mut entries = self.lock();
        let entry = entries.get_mut(key)?;
        if Self::is_expired(entry, now, self.ttl) {
            return None;
        }
        entry.last_access = now;
        Some(Arc::clone(&entry.values))
    }

    /// Insert values, evicting if the cache is full.
    pub fn put(&self, key: VirAttrCacheKey, values: Vec<String>) {
        let now = Utc::now();
        let mut entries = self.lock();

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            entries.retain(|_, e| !Self::is_expired(e, now, self.ttl));
            while entries.len() >= self.capacity {
                let lru = entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_access)
                    .map(|(k, _)| k.clone());
                match lru {
                    Some(k) => {
                        entries.remove(&k);
                    }
                    None => break,
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                values: Arc::new(values),
                created: now,
                last_access: now,
                force_expired: false,
            },
        );
    }

    /// Force-expire an entry. The entry stays in the map for bookkeeping
    /// but reads as absent until overwritten or evicted.
    pub fn expire(&self, key: &VirAttrCacheKey) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.force_expired = true;
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> VirAttrCacheStats {
        let now = Utc::now();
        let entries = self.lock();
        let total_count = entries.len();
        let expired_count = entries
            .values()
            .filter(|e| Self::is_expired(e, now, self.ttl))
            .count();
        VirAttrCacheStats {
            total_count,
            expired_count,
        }
    }

    fn is_expired(entry: &CacheEntry, now: DateTime<Utc>, ttl: Duration) -> bool {
        entry.force_expired || now - entry.created > ttl
    }

    // A panicked writer cannot leave the map half-mutated (every mutation
    // is a single insert/remove/flag), so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<VirAttrCacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(attr: &str) -> VirAttrCacheKey {
        VirAttrCacheKey::new(IdentityKind::User, IdentityId::new(), attr)
    }

    #[test]
    fn test_put_and_get() {
        let cache = VirAttrCache::new(10, 300);
        let k = key("groups");
        cache.put(k.clone(), vec!["admins".to_string()]);

        let values = cache.get(&k).unwrap();
        assert_eq!(*values, vec!["admins".to_string()]);
        assert!(cache.get(&key("other")).is_none());
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = VirAttrCache::new(10, 0);
        let k = key("groups");
        cache.put(k.clone(), vec!["admins".to_string()]);

        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(cache.get(&k).is_none());

        let stats = cache.stats();
        assert_eq!(stats.total_count, 1);
        assert_eq!(stats.expired_count, 1);
    }

    #[test]
    fn test_expire_keeps_bookkeeping() {
        let cache = VirAttrCache::new(10, 300);
        let k = key("groups");
        cache.put(k.clone(), vec!["admins".to_string()]);

        cache.expire(&k);
        assert!(cache.get(&k).is_none());

        let stats = cache.stats();
        assert_eq!(stats.total_count, 1);
        assert_eq!(stats.expired_count, 1);

        // a fresh put revives the entry
        cache.put(k.clone(), vec!["users".to_string()]);
        assert_eq!(*cache.get(&k).unwrap(), vec!["users".to_string()]);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let cache = VirAttrCache::new(3, 300);
        for i in 0..10 {
            cache.put(key(&format!("attr{i}")), vec![i.to_string()]);
        }
        assert!(cache.stats().total_count <= 3);
    }

    #[test]
    fn test_expired_evicted_before_live() {
        let cache = VirAttrCache::new(2, 300);
        let stale = key("stale");
        let live = key("live");
        cache.put(stale.clone(), vec!["old".to_string()]);
        cache.put(live.clone(), vec!["new".to_string()]);
        cache.expire(&stale);

        cache.put(key("third"), vec!["x".to_string()]);

        // the force-expired entry made room; the live one survived
        assert!(cache.get(&live).is_some());
        assert!(cache.stats().total_count <= 2);
    }

    #[test]
    fn test_lru_eviction_when_nothing_expired() {
        let cache = VirAttrCache::new(2, 300);
        let a = key("a");
        let b = key("b");
        cache.put(a.clone(), vec!["1".to_string()]);
        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.put(b.clone(), vec!["2".to_string()]);
        std::thread::sleep(std::time::Duration::from_millis(5));

        // touch a so b becomes least recently accessed
        assert!(cache.get(&a).is_some());
        std::thread::sleep(std::time::Duration::from_millis(5));

        cache.put(key("c"), vec!["3".to_string()]);

        assert!(cache.get(&a).is_some());
        assert!(cache.get(&b).is_none());
    }
}
