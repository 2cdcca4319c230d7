//! Time-bounded in-memory caches for derived statistics.
//!
//! Entries expire on read: an expired entry is treated as a miss and dropped
//! at that moment, there is no background sweep. Concurrent misses on the
//! same key are coalesced so only one caller computes the value while the
//! others wait and then read it.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

use crate::models::{EntityDetail, Overview};

pub const OVERVIEW_TTL: Duration = Duration::from_secs(3600);
pub const DETAIL_TTL: Duration = Duration::from_secs(3600);
pub const LISTING_TTL: Duration = Duration::from_secs(6 * 3600);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

type FillLocks<K> = std::sync::Mutex<HashMap<K, Arc<Mutex<()>>>>;

/// A caller's claim on a key's fill lock. Dropping it, including when the
/// caller's future is cancelled mid-fill, releases the table entry once no
/// other caller is waiting on it.
struct FillSlot<'a, K: Eq + Hash> {
    locks: &'a FillLocks<K>,
    key: K,
    lock: Arc<Mutex<()>>,
}

impl<'a, K: Eq + Hash + Clone> FillSlot<'a, K> {
    fn acquire(locks: &'a FillLocks<K>, key: &K) -> Self {
        let lock = locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone();
        Self {
            locks,
            key: key.clone(),
            lock,
        }
    }
}

impl<K: Eq + Hash> Drop for FillSlot<'_, K> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the table and this slot still hold the lock
        let unused = Arc::strong_count(&self.lock) <= 2
            && locks
                .get(&self.key)
                .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock));
        if unused {
            locks.remove(&self.key);
        }
    }
}

/// Read-through cache with a fixed time-to-live.
pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Duration,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    fill_locks: FillLocks<K>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: RwLock::new(HashMap::new()),
            fill_locks: std::sync::Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, without touching the counters.
    async fn fresh(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    /// Look up `key`. Expired entries count as misses and are removed.
    pub async fn get(&self, key: &K) -> Option<V> {
        if let Some(value) = self.fresh(key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("{} cache hit for {}", self.name, key);
            return Some(value);
        }

        {
            let mut entries = self.entries.write().await;
            if entries.get(key).is_some_and(|entry| entry.is_expired()) {
                entries.remove(key);
                self.expirations.fetch_add(1, Ordering::Relaxed);
                debug!("{} cache entry expired for {}", self.name, key);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("{} cache miss for {}", self.name, key);
        None
    }

    pub async fn insert(&self, key: K, value: V) {
        debug!("{} cache store for {} (ttl {:?})", self.name, key, self.ttl);
        let entry = CacheEntry::new(value, self.ttl);
        self.entries.write().await.insert(key, entry);
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// Only one computation per key runs at a time; callers that miss while
    /// another is filling the same key wait for it and reuse its value.
    /// Errors are returned as-is and nothing is stored.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }

        let slot = FillSlot::acquire(&self.fill_locks, &key);
        let _guard = slot.lock.lock().await;

        let filled = self.fresh(&key).await;
        match filled {
            Some(value) => {
                debug!("{} cache filled concurrently for {}", self.name, key);
                Ok(value)
            }
            None => {
                let computed = compute().await;
                if let Ok(value) = &computed {
                    self.insert(key.clone(), value.clone()).await;
                }
                computed
            }
        }
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.write().await.remove(key);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            entries: self.len().await,
        }
    }
}

/// Key for a format overview.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OverviewKey {
    pub period: String,
    pub format: String,
}

impl OverviewKey {
    pub fn new(period: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            format: format.into(),
        }
    }
}

impl fmt::Display for OverviewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stats:{}:{}", self.period, self.format)
    }
}

/// Key for one entity's detail within a format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetailKey {
    pub period: String,
    pub format: String,
    pub name: String,
}

impl DetailKey {
    pub fn new(period: impl Into<String>, format: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            format: format.into(),
            name: name.into(),
        }
    }

    pub fn overview_key(&self) -> OverviewKey {
        OverviewKey::new(self.period.clone(), self.format.clone())
    }
}

impl fmt::Display for DetailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "details:{}:{}:{}", self.period, self.format, self.name)
    }
}

/// Key for upstream listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListingKey {
    Periods,
    Formats(String),
}

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingKey::Periods => write!(f, "periods"),
            ListingKey::Formats(period) => write!(f, "formats:{}", period),
        }
    }
}

/// Overview and detail results, one logical cache with a namespace per shape.
pub struct DerivationCache {
    pub overviews: TtlCache<OverviewKey, Arc<Overview>>,
    pub details: TtlCache<DetailKey, Arc<EntityDetail>>,
}

impl DerivationCache {
    pub fn new(overview_ttl: Duration, detail_ttl: Duration) -> Self {
        Self {
            overviews: TtlCache::new("overview", overview_ttl),
            details: TtlCache::new("detail", detail_ttl),
        }
    }

    pub async fn clear(&self) {
        self.overviews.clear().await;
        self.details.clear().await;
    }
}

impl Default for DerivationCache {
    fn default() -> Self {
        Self::new(OVERVIEW_TTL, DETAIL_TTL)
    }
}

/// Period and format listings, which change far less often than usage data.
pub type ListingCache = TtlCache<ListingKey, Vec<String>>;

/// Listing cache, normally built with [`LISTING_TTL`].
pub fn listing_cache(ttl: Duration) -> ListingCache {
    TtlCache::new("listing", ttl)
}
