//! # Cache Entries
//!
//! Every entry tracks how often and how recently it was read. Reads happen
//! under the shared (read) side of the index lock, so access statistics are
//! atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Stored payload: raw bytes or an owned value.
#[derive(Debug)]
pub enum CachedValue<V> {
    Simple(Arc<[u8]>),
    Value(Arc<V>),
}

impl<V> Clone for CachedValue<V> {
    fn clone(&self) -> Self {
        match self {
            CachedValue::Simple(bytes) => CachedValue::Simple(Arc::clone(bytes)),
            CachedValue::Value(value) => CachedValue::Value(Arc::clone(value)),
        }
    }
}

impl<V> CachedValue<V> {
    pub fn is_simple(&self) -> bool {
        matches!(self, CachedValue::Simple(_))
    }

    pub fn into_value(self) -> Option<Arc<V>> {
        match self {
            CachedValue::Value(value) => Some(value),
            CachedValue::Simple(_) => None,
        }
    }

    pub fn into_bytes(self) -> Option<Arc<[u8]>> {
        match self {
            CachedValue::Simple(bytes) => Some(bytes),
            CachedValue::Value(_) => None,
        }
    }
}

/// One cached item plus its access statistics.
pub struct CacheEntry<V> {
    key: Vec<u8>,
    ticks: AtomicU64,
    /// Microseconds since the owning cache's epoch.
    last_access: AtomicU64,
    memory_size: usize,
    value: CachedValue<V>,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(key: &[u8], value: CachedValue<V>, memory_size: usize, now: u64) -> Self {
        Self {
            key: key.to_vec(),
            ticks: AtomicU64::new(0),
            last_access: AtomicU64::new(now),
            memory_size,
            value,
        }
    }

    /// Fixed overhead charged to byte-payload entries.
    pub fn header_size() -> usize {
        std::mem::size_of::<CacheEntry<()>>()
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn value(&self) -> &CachedValue<V> {
        &self.value
    }

    pub fn memory_size(&self) -> usize {
        self.memory_size
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Record one access at `now`.
    pub(crate) fn touch(&self, now: u64) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.last_access.store(now, Ordering::Relaxed);
    }

    /// Time since the last access (or since insertion).
    pub fn age(&self, now: u64) -> Duration {
        Duration::from_micros(now.saturating_sub(self.last_access.load(Ordering::Relaxed)))
    }
}

/// Access statistics of one entry, as reported by
/// [`crate::ManagedCache::entry_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStats {
    pub ticks: u64,
    pub age: Duration,
    pub memory_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_bumps_ticks_and_resets_age() {
        let entry: CacheEntry<u32> = CacheEntry::new(b"k", CachedValue::Value(Arc::new(1)), 9, 100);
        assert_eq!(entry.age(1_100), Duration::from_micros(1_000));

        entry.touch(1_100);
        entry.touch(1_200);
        assert_eq!(entry.ticks(), 2);
        assert_eq!(entry.age(1_300), Duration::from_micros(100));
    }

    #[test]
    fn test_age_never_underflows() {
        let entry: CacheEntry<u32> = CacheEntry::new(b"k", CachedValue::Value(Arc::new(1)), 9, 500);
        assert_eq!(entry.age(10), Duration::ZERO);
    }

    #[test]
    fn test_cached_value_accessors() {
        let simple: CachedValue<u32> = CachedValue::Simple(Arc::from(&b"abc"[..]));
        assert!(simple.is_simple());
        assert!(simple.clone().into_value().is_none());
        assert_eq!(&*simple.into_bytes().unwrap(), b"abc");
    }
}
