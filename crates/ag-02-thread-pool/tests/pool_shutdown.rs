//! Shutdown escalation tests for the thread pool.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ag_02_thread_pool::{PoolError, Signal, StopPolicy, ThreadPool, ThreadState, ThreadStatus};

// =============================================================================
// TEST HELPERS
// =============================================================================

fn make_policy() -> StopPolicy {
    StopPolicy {
        poll_interval: Duration::from_millis(1),
        start_window: Duration::from_secs(2),
        halt_grace: Duration::from_millis(10),
        quit_window: Duration::from_millis(150),
        panic_window: Duration::from_millis(100),
    }
}

// =============================================================================
// GRACEFUL SHUTDOWN
// =============================================================================

#[test]
fn test_shutdown_empties_pool() {
    let pool = ThreadPool::with_policy("shutdown", make_policy());
    for _ in 0..4 {
        pool.spawn(|ctx| {
            ctx.set_status(ThreadStatus::Napping);
            ctx.nap(Duration::from_millis(1), 4);
        })
        .unwrap();
    }
    assert_eq!(pool.pool_size(), 4);
    assert_eq!(pool.current_thread_count(), 4);

    pool.shutdown().unwrap();
    assert_eq!(pool.pool_size(), 0);
    assert_eq!(pool.current_thread_count(), 0);
}

#[test]
fn test_worker_that_ignores_halt_is_escalated_to_panic_stop() {
    let pool = ThreadPool::with_policy("escalate", make_policy());
    let saw_panic_stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&saw_panic_stop);

    // Only honours PanicStop.
    let id = pool
        .spawn(move |ctx| loop {
            if ctx.signal() == Signal::PanicStop {
                flag.store(true, Ordering::SeqCst);
                return;
            }
            thread::sleep(Duration::from_millis(1));
        })
        .unwrap();

    pool.stop(id).unwrap();
    assert!(saw_panic_stop.load(Ordering::SeqCst));
    assert_eq!(pool.pool_size(), 0);
}

// =============================================================================
// HARD FAILURE IS REPORTED, NEVER A HANG
// =============================================================================

#[test]
fn test_stuck_worker_reports_stop_timeout() {
    let pool = ThreadPool::with_policy("stuck", make_policy());
    let release = Arc::new(AtomicBool::new(false));
    let gate = Arc::clone(&release);

    let id = pool
        .spawn(move |_| {
            while !gate.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();

    let started = Instant::now();
    let outcome = pool.stop(id);
    assert_eq!(outcome, Err(PoolError::StopTimeout { ids: vec![id] }));
    assert!(started.elapsed() < Duration::from_secs(2));

    release.store(true, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(pool.worker(id).map(|w| w.state), Some(ThreadState::Stopped));
    pool.shutdown().unwrap();
    assert_eq!(pool.pool_size(), 0);
}

#[test]
fn test_ids_are_not_reused() {
    let pool = ThreadPool::with_policy("ids", make_policy());
    let runs = Arc::new(AtomicUsize::new(0));
    let mut seen = Vec::new();
    for _ in 0..3 {
        let runs = Arc::clone(&runs);
        let id = pool
            .spawn(move |ctx| {
                runs.fetch_add(1, Ordering::SeqCst);
                ctx.nap(Duration::from_millis(1), 2);
            })
            .unwrap();
        pool.stop(id).unwrap();
        seen.push(id);
    }
    assert_eq!(seen, vec![0, 1, 2]);
    assert!(runs.load(Ordering::SeqCst) >= 3);
}
