//! # Managed Cache (ag-03)
//!
//! Byte-keyed cache built on the ordered index. Every entry carries access
//! statistics (ticks, last access, memory size), and a background worker
//! keeps the cache inside its item-count, memory and TTL budgets.
//!
//! ## Budgets
//!
//! | Budget | Default | Over budget when |
//! |--------|---------|------------------|
//! | `max_items` | 2048 | `item_count >= max_items` |
//! | `max_memory` | 2 MiB | `memory_bytes >= max_memory` |
//! | `ttl` | 300 s | entry age `>= ttl` (zero disables) |
//!
//! ## Locking
//!
//! The index sits behind one reader/writer lock ([`LockMode`] picks blocking
//! or spinning acquisition). The aggregate counters use a separate mutex and
//! are only touched while the index write lock is held.
//!
//! Concurrent callers that miss on the same key may both compute and try to
//! insert; the second insert fails with [`CacheError::DuplicateKey`].

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
mod eviction;
mod lock;
pub mod service;

pub use domain::{
    CacheConfig, CacheEntry, CacheError, CacheStatus, CachedValue, EntryStats, EvictionReport,
    LockMode, DEFAULT_MAX_ITEMS, DEFAULT_MAX_MEMORY, DEFAULT_TTL,
};
pub use service::ManagedCache;
