//! # Thread Pool (ag-02)
//!
//! Generic spawn / stop / signal abstraction over native threads. The
//! managed cache hosts its eviction loop here and the server hosts both its
//! manager thread and its connection workers.
//!
//! ## Cancellation Model
//!
//! There is no forced termination. Each worker carries a single
//! [`WorkerLifecycle`] value combining its state and pending signal; the
//! pool only ever moves that value through the transition table and waits.
//! Worker functions observe it through [`WorkerContext::should_run`].
//!
//! Stopping escalates in three bounded windows (see [`StopPolicy`]):
//!
//! 1. `Halt` - the worker finishes its current iteration and exits.
//! 2. `Quit` - sent if the worker is still alive after the halt grace period.
//! 3. `PanicStop` - sent if it is still alive after the quit window.
//!
//! A worker still alive after the PanicStop window is reported as a
//! [`PoolError::StopTimeout`]; the call never hangs.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod service;

pub use domain::{
    LifecycleEvent, PoolError, Signal, StopPolicy, ThreadState, ThreadStatus, WorkerId,
    WorkerLifecycle,
};
pub use service::{ThreadPool, WorkerContext, WorkerFn, WorkerSnapshot};
