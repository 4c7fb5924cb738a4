//! # Cache Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::CacheError;

pub const DEFAULT_MAX_ITEMS: usize = 2048;
pub const DEFAULT_MAX_MEMORY: usize = 2 * 1024 * 1024;
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// How the index lock is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    /// Park the thread until the lock is available.
    #[default]
    Blocking,
    /// Busy-wait on `try_*` acquisition.
    Spinning,
}

/// Budgets and eviction pacing for a [`crate::ManagedCache`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Item-count budget; the cache is over budget at `>= max_items`.
    pub max_items: usize,
    /// Memory budget in bytes; the cache is over budget at `>= max_memory`.
    pub max_memory: usize,
    /// Age after which an entry is eligible for eviction. Zero disables TTL.
    pub ttl: Duration,
    pub lock_mode: LockMode,
    /// Run the eviction loop on a background worker.
    pub background_eviction: bool,
    /// Maximum eviction candidates queued per pass.
    pub scan_limit: usize,
    /// Entries examined per lock acquisition during a scan.
    pub yield_every: usize,
    /// Pause between lock acquisitions during a scan.
    pub yield_pause: Duration,
    pub nap_increment: Duration,
    pub nap_increments: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            max_memory: DEFAULT_MAX_MEMORY,
            ttl: DEFAULT_TTL,
            lock_mode: LockMode::Blocking,
            background_eviction: true,
            scan_limit: 1024,
            yield_every: 8,
            yield_pause: Duration::from_micros(1024),
            nap_increment: Duration::from_micros(1024),
            nap_increments: 1024,
        }
    }
}

impl CacheConfig {
    pub fn ttl_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        let reason = if self.max_items == 0 {
            "max_items must be at least 1"
        } else if self.max_memory == 0 {
            "max_memory must be at least 1"
        } else if self.scan_limit == 0 {
            "scan_limit must be at least 1"
        } else if self.yield_every == 0 {
            "yield_every must be at least 1"
        } else {
            return Ok(());
        };

        Err(CacheError::InvalidConfig {
            reason: reason.to_string(),
        })
    }
}
