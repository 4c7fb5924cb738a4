//! # In-Process Flows
//!
//! The core crates working together without a socket:
//!
//! 1. **Ordered index** under a shuffled workload
//! 2. **Dispatcher → managed cache**: repeated requests skip the handler
//! 3. **Cache budgets** enforced on responses stored by the dispatcher
//! 4. **Thread pool → dispatcher**: concurrent in-process transactions

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use rand::seq::SliceRandom;

    use ag_01_ordered_index::OrderedIndex;
    use ag_02_thread_pool::{ThreadPool, ThreadStatus};
    use ag_03_managed_cache::CacheConfig;
    use ag_04_transaction_dispatch::{
        LineIdentifier, Request, Response, Sha256Hash, TransactionDispatcher,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn key_for(n: u32) -> Vec<u8> {
        format!("{:06}", n).into_bytes()
    }

    fn make_cache_config(max_items: usize) -> CacheConfig {
        CacheConfig {
            max_items,
            background_eviction: false,
            ..CacheConfig::default()
        }
    }

    /// Dispatcher whose `echo` handler counts its invocations.
    fn make_dispatcher(calls: Arc<AtomicUsize>) -> TransactionDispatcher {
        let dispatcher = TransactionDispatcher::new();
        dispatcher.set_identify_strategy(LineIdentifier);
        dispatcher.set_hash_strategy(Sha256Hash);
        dispatcher
            .add_handler(false, "echo", "echo", move |request: &Request| {
                calls.fetch_add(1, Ordering::SeqCst);
                let text = request.text();
                let rest = text.strip_prefix("echo ")?;
                Some(Response::new(rest.as_bytes().to_vec()))
            })
            .unwrap();
        dispatcher
    }

    // =============================================================================
    // ORDERED INDEX
    // =============================================================================

    #[test]
    fn test_shuffled_inserts_iterate_in_order() {
        let mut keys: Vec<u32> = (1..=1000).collect();
        keys.shuffle(&mut rand::thread_rng());

        let mut index = OrderedIndex::new();
        for &key in &keys {
            index.put(&key_for(key), key).unwrap();
        }
        index.validate().unwrap();
        assert_eq!(index.len(), 1000);

        let values: Vec<u32> = index.iter().map(|(_, value)| *value).collect();
        assert_eq!(values, (1..=1000).collect::<Vec<_>>());

        assert_eq!(index.get_next(&key_for(500)), Some(&501));
        assert_eq!(index.get_previous(&key_for(500)), Some(&499));
        assert_eq!(index.get_next(&key_for(1000)), None);
        assert_eq!(index.get_previous(&key_for(1)), None);

        keys.shuffle(&mut rand::thread_rng());
        for &key in keys.iter().take(900) {
            assert_eq!(index.remove(&key_for(key)).unwrap(), key);
        }
        index.validate().unwrap();
        assert_eq!(index.len(), 100);

        let mut survivors: Vec<u32> = keys[900..].to_vec();
        survivors.sort_unstable();
        let values: Vec<u32> = index.iter().map(|(_, value)| *value).collect();
        assert_eq!(values, survivors);
    }

    // =============================================================================
    // DISPATCHER AND CACHE
    // =============================================================================

    #[test]
    fn test_repeated_request_served_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = make_dispatcher(Arc::clone(&calls));
        dispatcher.enable_cache(make_cache_config(64)).unwrap();

        let request = Request::new("echo twice");
        for _ in 0..2 {
            assert_eq!(dispatcher.exec(&request).unwrap().payload, b"twice");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.cache().unwrap().len(), 1);
    }

    #[test]
    fn test_cached_responses_respect_item_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = make_dispatcher(Arc::clone(&calls));
        dispatcher.enable_cache(make_cache_config(4)).unwrap();

        for n in 0..8 {
            let request = Request::new(format!("echo item-{n}"));
            dispatcher.exec(&request).unwrap();
        }
        let cache = dispatcher.cache().unwrap();
        assert_eq!(cache.len(), 8);

        let report = cache.run_eviction_cycle();
        assert!(report.evicted > 0);
        assert!(cache.len() < 4);
        assert!(!cache.status().is_over(&cache.config()));
    }

    // =============================================================================
    // THREAD POOL AND DISPATCHER
    // =============================================================================

    #[test]
    fn test_pool_workers_share_one_dispatcher() {
        const TARGET: usize = 200;

        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = Arc::new(make_dispatcher(Arc::clone(&calls)));
        let completed = Arc::new(AtomicUsize::new(0));

        let pool = ThreadPool::new("flow-client");
        for _ in 0..4 {
            let dispatcher = Arc::clone(&dispatcher);
            let completed = Arc::clone(&completed);
            pool.spawn(move |ctx| {
                ctx.set_status(ThreadStatus::Busy);
                let reply = dispatcher.exec(&Request::new("echo pooled"));
                if matches!(reply, Ok(ref response) if response.payload == b"pooled") {
                    completed.fetch_add(1, Ordering::SeqCst);
                }
                ctx.set_status(ThreadStatus::Napping);
                ctx.nap(Duration::from_micros(100), 1);
            })
            .unwrap();
        }

        let deadline = Instant::now() + Duration::from_secs(10);
        while completed.load(Ordering::SeqCst) < TARGET && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        pool.shutdown().unwrap();

        let completed = completed.load(Ordering::SeqCst);
        assert!(completed >= TARGET);
        assert_eq!(calls.load(Ordering::SeqCst), completed);
        assert_eq!(
            dispatcher.handler_metrics("echo").unwrap().executions,
            completed as u64
        );
        assert_eq!(pool.pool_size(), 0);
    }
}
