//! # Eviction
//!
//! Two passes over the index, run while the cache is over budget:
//!
//! 1. **TTL sweep.** Entries older than the TTL are queued; every other
//!    entry feeds running averages of ticks, memory size and age.
//! 2. **Big, old, or cold.** If still over budget, queue entries that are
//!    expired, or at least average size with at most average ticks, or at
//!    least average age with at most average ticks. Removal stops once the
//!    cache is back under budget.
//!
//! Scans take the read lock for `yield_every` entries at a time and pause
//! between acquisitions, so readers and writers interleave with a scan.
//! `should_run` is polled between batches and between removals; once it
//! returns false the cycle stops where it is.

use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::domain::{CacheConfig, CacheEntry, EvictionReport};
use crate::service::CacheShared;

/// Running sums over the entries that survived the TTL sweep.
#[derive(Debug, Default, Clone, Copy)]
struct Survivors {
    count: u64,
    ticks: u64,
    memory: u64,
    age: Duration,
}

impl Survivors {
    fn add<V>(&mut self, entry: &CacheEntry<V>, age: Duration) {
        self.count += 1;
        self.ticks += entry.ticks();
        self.memory += entry.memory_size() as u64;
        self.age += age;
    }

    fn averages(&self) -> Option<Averages> {
        if self.count == 0 {
            return None;
        }
        Some(Averages {
            ticks: self.ticks as f64 / self.count as f64,
            memory: self.memory as f64 / self.count as f64,
            age: self.age.as_secs_f64() / self.count as f64,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Averages {
    ticks: f64,
    memory: f64,
    age: f64,
}

struct Scan {
    queued: Vec<Vec<u8>>,
    scanned: usize,
    survivors: Survivors,
}

/// Walk the index from the first key, queueing up to `scan_limit` keys for
/// which `select` returns true.
fn scan<V>(
    shared: &CacheShared<V>,
    config: &CacheConfig,
    should_run: &dyn Fn() -> bool,
    mut select: impl FnMut(&CacheEntry<V>, Duration) -> bool,
) -> Scan {
    let mut result = Scan {
        queued: Vec::new(),
        scanned: 0,
        survivors: Survivors::default(),
    };
    let mut cursor: Vec<u8> = Vec::new();

    'walk: while should_run() {
        {
            let index = shared.index.read();
            let now = shared.now();
            for _ in 0..config.yield_every {
                let Some((key, entry)) = index.next_entry(&cursor) else {
                    break 'walk;
                };
                cursor = key.to_vec();
                result.scanned += 1;

                let age = entry.age(now);
                if select(entry, age) {
                    result.queued.push(cursor.clone());
                    if result.queued.len() >= config.scan_limit {
                        break 'walk;
                    }
                } else {
                    result.survivors.add(entry, age);
                }
            }
        }
        thread::sleep(config.yield_pause);
    }

    result
}

fn expired(config: &CacheConfig, age: Duration) -> bool {
    config.ttl_enabled() && age >= config.ttl
}

/// Run one eviction cycle. When the cache is under budget only expired
/// entries are removed, and only if a TTL is configured.
pub(crate) fn run_cycle<V>(
    shared: &CacheShared<V>,
    config: &CacheConfig,
    should_run: &dyn Fn() -> bool,
) -> EvictionReport {
    let mut report = EvictionReport::default();
    let over_budget = shared.status().is_over(config);

    if !over_budget && !config.ttl_enabled() {
        return report;
    }

    let first = scan(shared, config, should_run, |_, age| expired(config, age));
    report.scanned += first.scanned;
    for key in &first.queued {
        if !should_run() {
            return report;
        }
        if shared.remove(key).is_ok() {
            report.expired += 1;
        }
    }

    if !should_run() || !over_budget || !shared.status().is_over(config) {
        return report;
    }

    let Some(averages) = first.survivors.averages() else {
        return report;
    };

    let second = scan(shared, config, should_run, |entry, age| {
        let cold = entry.ticks() as f64 <= averages.ticks;
        expired(config, age)
            || (entry.memory_size() as f64 >= averages.memory && cold)
            || (age.as_secs_f64() >= averages.age && cold)
    });
    report.scanned += second.scanned;

    for key in &second.queued {
        if !should_run() || !shared.status().is_over(config) {
            break;
        }
        if shared.remove(key).is_ok() {
            report.evicted += 1;
        }
    }

    debug!(
        scanned = report.scanned,
        expired = report.expired,
        evicted = report.evicted,
        avg_ticks = averages.ticks,
        avg_memory = averages.memory,
        avg_age_secs = averages.age,
        "Eviction cycle complete"
    );

    report
}
