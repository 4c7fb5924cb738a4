//! # Asgard Core Benchmarks
//!
//! | Crate | Operation | Shape |
//! |-------|-----------|-------|
//! | ag-01 Ordered Index | put, get, get_next | O(log n) |
//! | ag-03 Managed Cache | put, get, eviction cycle | O(log n) per key |
//! | ag-04 Transaction Dispatch | in-process exec, with and without cache | handler cost |

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::seq::SliceRandom;

use ag_01_ordered_index::OrderedIndex;
use ag_03_managed_cache::{CacheConfig, ManagedCache};
use ag_04_transaction_dispatch::{
    LineIdentifier, Request, Response, Sha256Hash, TransactionDispatcher,
};

fn key_for(n: usize) -> Vec<u8> {
    format!("key-{:08}", n).into_bytes()
}

fn shuffled_keys(count: usize) -> Vec<Vec<u8>> {
    let mut keys: Vec<Vec<u8>> = (0..count).map(key_for).collect();
    keys.shuffle(&mut rand::thread_rng());
    keys
}

// ============================================================================
// ag-01: Ordered Index
// ============================================================================

fn bench_ordered_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("ag-01-ordered-index");
    group.measurement_time(Duration::from_secs(5));

    for size in [1_000usize, 10_000, 100_000] {
        let keys = shuffled_keys(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("put_shuffled", size), &keys, |b, keys| {
            b.iter(|| {
                let mut index = OrderedIndex::new();
                for (n, key) in keys.iter().enumerate() {
                    index.put(key, n).ok();
                }
                black_box(index.len())
            })
        });

        let mut index = OrderedIndex::new();
        for (n, key) in keys.iter().enumerate() {
            index.put(key, n).ok();
        }

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("get", size), &index, |b, index| {
            let probe = key_for(size / 2);
            b.iter(|| black_box(index.get(&probe)))
        });
        group.bench_with_input(BenchmarkId::new("get_next", size), &index, |b, index| {
            let probe = key_for(size / 2);
            b.iter(|| black_box(index.get_next(&probe)))
        });
    }

    group.finish();
}

// ============================================================================
// ag-03: Managed Cache
// ============================================================================

fn make_cache(max_items: usize) -> ManagedCache<Vec<u8>> {
    let config = CacheConfig {
        max_items,
        max_memory: usize::MAX / 2,
        background_eviction: false,
        ..CacheConfig::default()
    };
    match ManagedCache::new(config) {
        Ok(cache) => cache,
        Err(e) => panic!("cache config rejected: {e}"),
    }
}

fn bench_managed_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("ag-03-managed-cache");
    group.measurement_time(Duration::from_secs(5));

    let keys = shuffled_keys(2048);
    let payload = vec![0xA5u8; 256];

    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function("put_simple_2048", |b| {
        b.iter(|| {
            let cache = make_cache(usize::MAX / 2);
            for key in &keys {
                cache.put_simple(key, &payload).ok();
            }
            black_box(cache.len())
        })
    });

    let cache = make_cache(usize::MAX / 2);
    for key in &keys {
        cache.put_simple(key, &payload).ok();
    }
    group.throughput(Throughput::Elements(1));
    group.bench_function("get_simple_hit", |b| {
        let probe = key_for(1024);
        b.iter(|| black_box(cache.get_simple(&probe).is_ok()))
    });

    group.bench_function("eviction_cycle_over_budget", |b| {
        b.iter_with_setup(
            || {
                let cache = make_cache(1024);
                for key in &keys {
                    cache.put_simple(key, &payload).ok();
                }
                cache
            },
            |cache| black_box(cache.run_eviction_cycle()),
        )
    });

    group.finish();
}

// ============================================================================
// ag-04: Transaction Dispatch
// ============================================================================

fn make_dispatcher(cached: bool) -> TransactionDispatcher {
    let dispatcher = TransactionDispatcher::new();
    dispatcher.set_identify_strategy(LineIdentifier);
    dispatcher.set_hash_strategy(Sha256Hash);
    dispatcher
        .add_handler(false, "upper", "upper", |request: &Request| {
            Some(Response::new(request.text().to_uppercase()))
        })
        .ok();
    if cached {
        let config = CacheConfig {
            background_eviction: false,
            ..CacheConfig::default()
        };
        dispatcher.enable_cache(config).ok();
    }
    dispatcher
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("ag-04-transaction-dispatch");
    group.measurement_time(Duration::from_secs(5));
    group.throughput(Throughput::Elements(1));

    let request = Request::new("upper the quick brown fox jumps over the lazy dog\r\n");
    for cached in [false, true] {
        let dispatcher = make_dispatcher(cached);
        let label = if cached { "exec_cached" } else { "exec_uncached" };
        group.bench_function(label, |b| b.iter(|| black_box(dispatcher.exec(&request).is_ok())));
    }

    group.finish();
}

criterion_group!(benches, bench_ordered_index, bench_managed_cache, bench_dispatch);
criterion_main!(benches);
