//! Generic key/value cache with per-entry expiry.
//!
//! Expiry uses a single predicate, `expires_at <= now`, on both the lazy path
//! (`get` treats an expired entry as a miss and drops it) and the eager path
//! (`cleanup`, optionally driven by a background sweep task). `len` is a
//! storage count and includes expired entries that nobody has swept yet.
//!
//! Time comes from `tokio::time::Instant`, so tests can pause and advance it.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::domain::models::CacheConfig;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

type Entries<K, V> = Mutex<HashMap<K, CacheEntry<V>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn purge_expired<K, V>(entries: &Entries<K, V>, now: Instant) -> usize
where
    K: Eq + Hash,
{
    let mut map = lock(entries);
    let before = map.len();
    map.retain(|_, entry| !entry.is_expired(now));
    before - map.len()
}

/// TTL cache shared by reference between callers.
///
/// When built with auto cleanup, a Tokio task sweeps expired entries every
/// `cleanup_interval`. The task only holds a weak reference to the entries
/// and is aborted by [`TtlCache::destroy`] or on drop.
pub struct TtlCache<K, V> {
    entries: Arc<Entries<K, V>>,
    default_ttl: Duration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Create a cache without background sweeping.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            default_ttl,
            sweeper: Mutex::new(None),
        }
    }

    /// Create a cache that sweeps expired entries every `cleanup_interval`.
    ///
    /// Must be called from within a Tokio runtime for the sweep to run; outside
    /// one the cache still works but only expires lazily.
    pub fn with_auto_cleanup(default_ttl: Duration, cleanup_interval: Duration) -> Self {
        let cache = Self::new(default_ttl);
        let handle = Self::spawn_sweeper(Arc::downgrade(&cache.entries), cleanup_interval);
        *lock(&cache.sweeper) = handle;
        cache
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        if config.auto_cleanup {
            Self::with_auto_cleanup(config.default_ttl(), config.cleanup_interval())
        } else {
            Self::new(config.default_ttl())
        }
    }

    fn spawn_sweeper(entries: Weak<Entries<K, V>>, interval: Duration) -> Option<JoinHandle<()>> {
        if interval.is_zero() {
            warn!("TTL cache cleanup interval is zero, background sweep disabled");
            return None;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No Tokio runtime available, background sweep disabled");
            return None;
        };

        Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(entries) = entries.upgrade() else {
                    break;
                };
                let removed = purge_expired(&entries, Instant::now());
                if removed > 0 {
                    debug!(removed, "TTL cache sweep removed expired entries");
                }
            }
        }))
    }

    /// Value for `key`, or `None` if absent or expired. Expired entries are removed.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        let mut map = lock(&self.entries);
        match map.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => {}
        }
        map.remove(key);
        trace!("TTL cache entry expired on read");
        None
    }

    /// Insert or overwrite with the default TTL.
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert or overwrite; expiry is reset to `now + ttl` either way.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        lock(&self.entries).insert(key, CacheEntry { value, expires_at });
    }

    /// Remove `key`. Returns whether an entry was present.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        lock(&self.entries).remove(key).is_some()
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    /// Remove every expired entry now. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        purge_expired(&self.entries, Instant::now())
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Whether a background sweep task is currently attached.
    pub fn is_sweeping(&self) -> bool {
        lock(&self.sweeper)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the background sweep and drop all entries.
    pub fn destroy(&self) {
        if let Some(handle) = lock(&self.sweeper).take() {
            handle.abort();
        }
        self.clear();
    }
}

impl<K, V> Drop for TtlCache<K, V> {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.sweeper).take() {
            handle.abort();
        }
    }
}
