//! # Thread Pool Service
//!
//! Spawns named OS threads that repeatedly invoke a worker function while
//! their lifecycle is `Running(Ok)`. Shutdown is cooperative: the pool only
//! ever changes a worker's lifecycle and waits, with bounded polling windows
//! at each escalation step.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::{
    LifecycleEvent, PoolError, Signal, StopPolicy, ThreadState, ThreadStatus, WorkerId,
    WorkerLifecycle,
};

/// Function run by every worker. It is re-invoked for as long as the worker
/// should run; long-running bodies poll [`WorkerContext::should_run`].
pub type WorkerFn = Arc<dyn Fn(&WorkerContext) + Send + Sync + 'static>;

struct WorkerRecord {
    lifecycle: WorkerLifecycle,
    status: ThreadStatus,
    system_id: Option<String>,
}

struct WorkerShared {
    id: WorkerId,
    name: String,
    record: Mutex<WorkerRecord>,
}

impl WorkerShared {
    fn lifecycle(&self) -> WorkerLifecycle {
        self.record.lock().lifecycle
    }

    fn transition(&self, event: LifecycleEvent) -> Result<WorkerLifecycle, PoolError> {
        let mut record = self.record.lock();
        let next = record.lifecycle.apply(event)?;
        record.lifecycle = next;
        Ok(next)
    }
}

/// Handle a worker function uses to observe its own lifecycle.
#[derive(Clone)]
pub struct WorkerContext {
    shared: Arc<WorkerShared>,
}

impl WorkerContext {
    pub fn id(&self) -> WorkerId {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn should_run(&self) -> bool {
        self.shared.lifecycle().should_run()
    }

    pub fn state(&self) -> ThreadState {
        self.shared.lifecycle().state()
    }

    pub fn signal(&self) -> Signal {
        self.shared.lifecycle().signal()
    }

    pub fn set_status(&self, status: ThreadStatus) {
        self.shared.record.lock().status = status;
    }

    /// Sleep `increments` times `increment`, returning early (with `false`)
    /// as soon as the worker is asked to stop.
    pub fn nap(&self, increment: Duration, increments: u32) -> bool {
        for _ in 0..increments {
            if !self.should_run() {
                return false;
            }
            thread::sleep(increment);
        }
        self.should_run()
    }
}

/// Point-in-time view of one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSnapshot {
    pub id: WorkerId,
    pub name: String,
    pub system_id: Option<String>,
    pub state: ThreadState,
    pub status: ThreadStatus,
    pub signal: Signal,
}

struct WorkerEntry {
    shared: Arc<WorkerShared>,
    handle: Option<JoinHandle<()>>,
}

/// Pool of OS threads driven by [`WorkerFn`]s.
pub struct ThreadPool {
    name: String,
    policy: StopPolicy,
    next_id: AtomicUsize,
    workers: Mutex<BTreeMap<WorkerId, WorkerEntry>>,
}

impl ThreadPool {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_policy(name, StopPolicy::default())
    }

    pub fn with_policy(name: impl Into<String>, policy: StopPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            next_id: AtomicUsize::new(0),
            workers: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &StopPolicy {
        &self.policy
    }

    /// Spawn a worker and wait (bounded) until it is observed running.
    pub fn spawn<F>(&self, function: F) -> Result<WorkerId, PoolError>
    where
        F: Fn(&WorkerContext) + Send + Sync + 'static,
    {
        self.spawn_shared(Arc::new(function))
    }

    pub fn spawn_shared(&self, function: WorkerFn) -> Result<WorkerId, PoolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(WorkerShared {
            id,
            name: format!("{}-{}", self.name, id),
            record: Mutex::new(WorkerRecord {
                lifecycle: WorkerLifecycle::Init,
                status: ThreadStatus::Init,
                system_id: None,
            }),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(shared.name.clone())
            .spawn(move || run_worker(thread_shared, function))
            .map_err(|e| {
                error!(pool = %self.name, worker = id, error = %e, "Failed to spawn worker");
                PoolError::SpawnFailed {
                    reason: e.to_string(),
                }
            })?;

        self.workers.lock().insert(
            id,
            WorkerEntry {
                shared: Arc::clone(&shared),
                handle: Some(handle),
            },
        );

        self.wait_for(self.policy.start_window, || {
            shared.lifecycle() != WorkerLifecycle::Init
        });

        match shared.lifecycle() {
            WorkerLifecycle::Init => {
                warn!(pool = %self.name, worker = id, "Worker did not start in time");
                Err(PoolError::StartTimeout { id })
            }
            WorkerLifecycle::Error => Err(PoolError::StartFailed { id }),
            _ => {
                debug!(pool = %self.name, worker = id, "Worker spawned");
                Ok(id)
            }
        }
    }

    fn lookup(&self, id: WorkerId) -> Result<Arc<WorkerShared>, PoolError> {
        self.workers
            .lock()
            .get(&id)
            .map(|entry| Arc::clone(&entry.shared))
            .ok_or(PoolError::UnknownWorker { id })
    }

    /// Send Quit or PanicStop to a running worker.
    pub fn signal(&self, id: WorkerId, signal: Signal) -> Result<(), PoolError> {
        if !matches!(signal, Signal::Quit | Signal::PanicStop) {
            return Err(PoolError::InvalidSignal { signal });
        }

        let shared = self.lookup(id)?;
        let lifecycle = shared.lifecycle();
        if lifecycle.state() != ThreadState::Running {
            return Err(PoolError::NotRunning {
                id,
                state: lifecycle.state(),
            });
        }

        shared.transition(LifecycleEvent::Signal(signal))?;
        debug!(pool = %self.name, worker = id, signal = %signal, "Worker signalled");
        Ok(())
    }

    /// Stop one running worker: Halt, then Quit, then PanicStop.
    pub fn stop(&self, id: WorkerId) -> Result<(), PoolError> {
        let shared = self.lookup(id)?;
        let lifecycle = shared.lifecycle();
        if lifecycle.state() != ThreadState::Running {
            return Err(PoolError::NotRunning {
                id,
                state: lifecycle.state(),
            });
        }

        let remaining = self.escalate(vec![shared]);
        self.reap();

        if remaining.is_empty() {
            Ok(())
        } else {
            Err(PoolError::StopTimeout { ids: remaining })
        }
    }

    /// Halt every listed worker and escalate signals until they all reach a
    /// terminal state or the PanicStop window expires. Returns the ids of
    /// workers still alive.
    fn escalate(&self, workers: Vec<Arc<WorkerShared>>) -> Vec<WorkerId> {
        for worker in &workers {
            if worker.lifecycle().state() == ThreadState::Running {
                let _ = worker.transition(LifecycleEvent::Halt);
            }
        }

        let all_done = |workers: &[Arc<WorkerShared>]| {
            workers.iter().all(|worker| worker.lifecycle().is_terminal())
        };

        if self.wait_for(self.policy.halt_grace, || all_done(&workers)) {
            return Vec::new();
        }

        for (signal, window) in [
            (Signal::Quit, self.policy.quit_window),
            (Signal::PanicStop, self.policy.panic_window),
        ] {
            for worker in &workers {
                if !worker.lifecycle().is_terminal() {
                    let _ = worker.transition(LifecycleEvent::Signal(signal));
                }
            }
            if self.wait_for(window, || all_done(&workers)) {
                return Vec::new();
            }
            debug!(pool = %self.name, signal = %signal, "Workers still alive after signal window");
        }

        let remaining: Vec<WorkerId> = workers
            .iter()
            .filter(|worker| !worker.lifecycle().is_terminal())
            .map(|worker| worker.id)
            .collect();
        error!(pool = %self.name, workers = ?remaining, "Failed to stop workers");
        remaining
    }

    fn wait_for(&self, window: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + window;
        loop {
            if done() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(self.policy.poll_interval);
        }
    }

    /// Join and forget every worker that reached a terminal state.
    pub fn reap(&self) -> usize {
        let finished: Vec<WorkerEntry> = {
            let mut workers = self.workers.lock();
            let ids: Vec<WorkerId> = workers
                .iter()
                .filter(|(_, entry)| entry.shared.lifecycle().is_terminal())
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| workers.remove(&id))
                .collect()
        };

        let count = finished.len();
        for mut entry in finished {
            if let Some(handle) = entry.handle.take() {
                if handle.join().is_err() {
                    warn!(pool = %self.name, worker = entry.shared.id, "Worker thread panicked");
                }
            }
        }
        count
    }

    /// Stop every live worker and empty the pool. Workers that outlive the
    /// PanicStop window are detached and reported.
    pub fn shutdown(&self) -> Result<(), PoolError> {
        let live: Vec<Arc<WorkerShared>> = self
            .workers
            .lock()
            .values()
            .map(|entry| Arc::clone(&entry.shared))
            .filter(|shared| !shared.lifecycle().is_terminal())
            .collect();

        let remaining = if live.is_empty() {
            Vec::new()
        } else {
            info!(pool = %self.name, workers = live.len(), "Stopping worker pool");
            self.escalate(live)
        };

        self.reap();
        // Anything left is stuck; drop its handle so the pool still empties.
        self.workers.lock().clear();

        if remaining.is_empty() {
            Ok(())
        } else {
            Err(PoolError::StopTimeout { ids: remaining })
        }
    }

    /// Workers tracked by the pool, including ones not yet reaped.
    pub fn pool_size(&self) -> usize {
        self.workers.lock().len()
    }

    /// Workers running with no pending signal.
    pub fn current_thread_count(&self) -> usize {
        self.count_where(|record| record.lifecycle.should_run())
    }

    /// Workers running, busy, and with no pending signal.
    pub fn active_thread_count(&self) -> usize {
        self.count_where(|record| {
            record.lifecycle.should_run() && record.status == ThreadStatus::Busy
        })
    }

    fn count_where(&self, predicate: impl Fn(&WorkerRecord) -> bool) -> usize {
        self.workers
            .lock()
            .values()
            .filter(|entry| predicate(&*entry.shared.record.lock()))
            .count()
    }

    pub fn worker(&self, id: WorkerId) -> Option<WorkerSnapshot> {
        self.workers
            .lock()
            .get(&id)
            .map(|entry| snapshot_of(&entry.shared))
    }

    pub fn snapshot(&self) -> Vec<WorkerSnapshot> {
        self.workers
            .lock()
            .values()
            .map(|entry| snapshot_of(&entry.shared))
            .collect()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(pool = %self.name, error = %e, "Worker pool dropped with live workers");
        }
    }
}

fn snapshot_of(shared: &WorkerShared) -> WorkerSnapshot {
    let record = shared.record.lock();
    WorkerSnapshot {
        id: shared.id,
        name: shared.name.clone(),
        system_id: record.system_id.clone(),
        state: record.lifecycle.state(),
        status: record.status,
        signal: record.lifecycle.signal(),
    }
}

fn run_worker(shared: Arc<WorkerShared>, function: WorkerFn) {
    {
        let mut record = shared.record.lock();
        record.system_id = Some(format!("{:?}", thread::current().id()));
        match record.lifecycle.apply(LifecycleEvent::Started) {
            Ok(next) => record.lifecycle = next,
            Err(e) => {
                warn!(worker = shared.id, error = %e, "Worker could not start");
                return;
            }
        }
    }

    let context = WorkerContext {
        shared: Arc::clone(&shared),
    };

    while context.should_run() {
        if catch_unwind(AssertUnwindSafe(|| function(&context))).is_err() {
            error!(worker = shared.id, name = %shared.name, "Worker function panicked");
            context.set_status(ThreadStatus::Error);
            let _ = shared.transition(LifecycleEvent::Failed);
            return;
        }
    }

    match shared.transition(LifecycleEvent::Exited) {
        Ok(_) => debug!(worker = shared.id, name = %shared.name, "Worker stopped"),
        Err(e) => warn!(worker = shared.id, error = %e, "Unexpected worker exit"),
    }
}
