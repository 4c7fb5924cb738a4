pub mod config;
pub mod entry;
pub mod errors;

pub use config::{CacheConfig, LockMode, DEFAULT_MAX_ITEMS, DEFAULT_MAX_MEMORY, DEFAULT_TTL};
pub use entry::{CacheEntry, CachedValue, EntryStats};
pub use errors::CacheError;

/// Aggregate counters of a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatus {
    pub item_count: usize,
    pub memory_bytes: usize,
}

impl CacheStatus {
    pub fn is_over(&self, config: &CacheConfig) -> bool {
        self.item_count >= config.max_items || self.memory_bytes >= config.max_memory
    }
}

/// What one eviction cycle removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Entries examined across both passes.
    pub scanned: usize,
    /// Removed because they outlived the TTL.
    pub expired: usize,
    /// Removed by the big/old/cold policy.
    pub evicted: usize,
}

impl EvictionReport {
    pub fn removed(&self) -> usize {
        self.expired + self.evicted
    }
}
