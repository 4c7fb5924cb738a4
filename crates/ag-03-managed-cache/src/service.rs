//! # Managed Cache Service
//!
//! The index and the aggregate counters sit behind separate locks. Counters
//! are only ever updated while the index write lock is held, so the index
//! lock is always taken first.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ag_01_ordered_index::OrderedIndex;
use ag_02_thread_pool::{ThreadPool, ThreadStatus, WorkerContext};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::domain::{
    CacheConfig, CacheEntry, CacheError, CacheStatus, CachedValue, EntryStats, EvictionReport,
};
use crate::eviction;
use crate::lock::IndexLock;

pub(crate) struct CacheShared<V> {
    pub(crate) index: IndexLock<OrderedIndex<CacheEntry<V>>>,
    counters: Mutex<CacheStatus>,
    config: RwLock<CacheConfig>,
    epoch: Instant,
}

impl<V> CacheShared<V> {
    /// Microseconds since the cache was created.
    pub(crate) fn now(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
    }

    pub(crate) fn status(&self) -> CacheStatus {
        *self.counters.lock()
    }

    fn insert(&self, key: &[u8], value: CachedValue<V>, memory_size: usize) -> Result<(), CacheError> {
        // Re-checked by `put` under the write lock.
        if self.index.read().contains_key(key) {
            return Err(CacheError::DuplicateKey {
                key: String::from_utf8_lossy(key).into_owned(),
            });
        }

        let entry = CacheEntry::new(key, value, memory_size, self.now());
        let mut index = self.index.write();
        index.put(key, entry)?;

        let mut counters = self.counters.lock();
        counters.item_count += 1;
        counters.memory_bytes += memory_size;
        Ok(())
    }

    pub(crate) fn remove(&self, key: &[u8]) -> Result<CacheEntry<V>, CacheError> {
        let mut index = self.index.write();
        let entry = index.remove(key)?;

        let mut counters = self.counters.lock();
        counters.item_count = counters.item_count.saturating_sub(1);
        counters.memory_bytes = counters.memory_bytes.saturating_sub(entry.memory_size());
        Ok(entry)
    }

    /// Look up `key` (or its neighbour) and record the access.
    fn lookup(
        &self,
        key: &[u8],
        find: impl for<'a> Fn(
            &'a OrderedIndex<CacheEntry<V>>,
            &[u8],
        ) -> Option<&'a CacheEntry<V>>,
    ) -> Option<(Vec<u8>, CachedValue<V>)> {
        let index = self.index.read();
        let entry = find(&index, key)?;
        entry.touch(self.now());
        Some((entry.key().to_vec(), entry.value().clone()))
    }
}

/// Byte-keyed cache with access statistics and budget-driven eviction.
pub struct ManagedCache<V: Send + Sync + 'static> {
    shared: Arc<CacheShared<V>>,
    pool: ThreadPool,
}

impl<V: Send + Sync + 'static> ManagedCache<V> {
    /// Build a cache and, unless disabled in `config`, start its eviction
    /// worker.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        config.validate()?;

        let background = config.background_eviction;
        let shared = Arc::new(CacheShared {
            index: IndexLock::new(config.lock_mode, OrderedIndex::new()),
            counters: Mutex::new(CacheStatus::default()),
            config: RwLock::new(config),
            epoch: Instant::now(),
        });
        let pool = ThreadPool::new("cache-eviction");

        if background {
            let worker_shared = Arc::clone(&shared);
            pool.spawn(move |ctx| eviction_loop(&worker_shared, ctx))?;
        }

        info!(
            max_items = shared.config.read().max_items,
            max_memory = shared.config.read().max_memory,
            background,
            "Managed cache created"
        );

        Ok(Self { shared, pool })
    }

    /// Cache an owned value. The entry is charged `key.len() + size_hint`.
    pub fn put(&self, key: &[u8], value: V, size_hint: usize) -> Result<(), CacheError> {
        if key.is_empty() {
            return Err(invalid("key must not be empty"));
        }
        if size_hint == 0 {
            return Err(invalid("size hint must be greater than zero"));
        }
        self.shared
            .insert(key, CachedValue::Value(Arc::new(value)), key.len() + size_hint)
    }

    /// Cache a copy of `bytes`, charged key, header and payload length.
    pub fn put_simple(&self, key: &[u8], bytes: &[u8]) -> Result<(), CacheError> {
        if key.is_empty() {
            return Err(invalid("key must not be empty"));
        }
        let size = key.len() + CacheEntry::<V>::header_size() + bytes.len();
        self.shared
            .insert(key, CachedValue::Simple(Arc::from(bytes)), size)
    }

    pub fn get(&self, key: &[u8]) -> Option<CachedValue<V>> {
        self.shared
            .lookup(key, |index, key| index.get(key))
            .map(|(_, value)| value)
    }

    /// Nearest entry strictly after `key`, with its key.
    pub fn get_next(&self, key: &[u8]) -> Option<(Vec<u8>, CachedValue<V>)> {
        self.shared.lookup(key, |index, key| index.get_next(key))
    }

    /// Nearest entry strictly before `key`, with its key.
    pub fn get_previous(&self, key: &[u8]) -> Option<(Vec<u8>, CachedValue<V>)> {
        self.shared.lookup(key, |index, key| index.get_previous(key))
    }

    pub fn get_simple(&self, key: &[u8]) -> Result<Arc<[u8]>, CacheError> {
        let value = self.get(key).ok_or_else(|| not_found(key))?;
        into_simple(key, value)
    }

    pub fn get_next_simple(&self, key: &[u8]) -> Result<(Vec<u8>, Arc<[u8]>), CacheError> {
        let (found, value) = self.get_next(key).ok_or_else(|| not_found(key))?;
        let bytes = into_simple(&found, value)?;
        Ok((found, bytes))
    }

    pub fn get_previous_simple(&self, key: &[u8]) -> Result<(Vec<u8>, Arc<[u8]>), CacheError> {
        let (found, value) = self.get_previous(key).ok_or_else(|| not_found(key))?;
        let bytes = into_simple(&found, value)?;
        Ok((found, bytes))
    }

    /// Remove `key`; the stored value is dropped once no reader holds it.
    pub fn remove(&self, key: &[u8]) -> Result<(), CacheError> {
        self.shared.remove(key).map(drop)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.shared.index.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.shared.status().item_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut index = self.shared.index.write();
        index.clear();
        *self.shared.counters.lock() = CacheStatus::default();
        debug!("Managed cache cleared");
    }

    pub fn status(&self) -> CacheStatus {
        self.shared.status()
    }

    pub fn entry_stats(&self, key: &[u8]) -> Option<EntryStats> {
        let index = self.shared.index.read();
        let entry = index.get(key)?;
        Some(EntryStats {
            ticks: entry.ticks(),
            age: entry.age(self.shared.now()),
            memory_size: entry.memory_size(),
        })
    }

    pub fn config(&self) -> CacheConfig {
        self.shared.config.read().clone()
    }

    pub fn set_max_items(&self, max_items: usize) -> Result<(), CacheError> {
        if max_items == 0 {
            return Err(invalid("max_items must be at least 1"));
        }
        self.shared.config.write().max_items = max_items;
        Ok(())
    }

    pub fn set_max_memory(&self, max_memory: usize) -> Result<(), CacheError> {
        if max_memory == 0 {
            return Err(invalid("max_memory must be at least 1"));
        }
        self.shared.config.write().max_memory = max_memory;
        Ok(())
    }

    /// Zero disables expiry.
    pub fn set_ttl(&self, ttl: Duration) {
        self.shared.config.write().ttl = ttl;
    }

    /// Run one eviction cycle on the calling thread.
    pub fn run_eviction_cycle(&self) -> EvictionReport {
        let config = self.config();
        eviction::run_cycle(&self.shared, &config, &|| true)
    }

    /// Whether the background eviction worker is alive.
    pub fn is_evicting(&self) -> bool {
        self.pool.current_thread_count() > 0
    }
}

impl<V: Send + Sync + 'static> Drop for ManagedCache<V> {
    fn drop(&mut self) {
        if let Err(e) = self.pool.shutdown() {
            warn!(error = %e, "Eviction worker did not stop cleanly");
        }
    }
}

/// One iteration of the background worker: evict, then nap. A long nap
/// when under budget, a single increment when over budget but making no
/// progress.
fn eviction_loop<V>(shared: &CacheShared<V>, ctx: &WorkerContext) {
    ctx.set_status(ThreadStatus::Busy);
    let config = shared.config.read().clone();
    let report = eviction::run_cycle(shared, &config, &|| ctx.should_run());
    ctx.set_status(ThreadStatus::Napping);

    if report.removed() > 0 {
        debug!(
            expired = report.expired,
            evicted = report.evicted,
            "Background eviction removed entries"
        );
    }

    if !shared.status().is_over(&config) {
        ctx.nap(config.nap_increment, config.nap_increments);
    } else if report.removed() == 0 {
        ctx.nap(config.nap_increment, 1);
    }
}

fn into_simple<V>(key: &[u8], value: CachedValue<V>) -> Result<Arc<[u8]>, CacheError> {
    value.into_bytes().ok_or_else(|| CacheError::NotSimple {
        key: String::from_utf8_lossy(key).into_owned(),
    })
}

fn invalid(reason: &str) -> CacheError {
    CacheError::InvalidArgs {
        reason: reason.to_string(),
    }
}

fn not_found(key: &[u8]) -> CacheError {
    CacheError::NotFound {
        key: String::from_utf8_lossy(key).into_owned(),
    }
}
