//! # Domain Errors

use thiserror::Error;

use super::lifecycle::{LifecycleEvent, WorkerLifecycle};
use super::value_objects::{Signal, ThreadState, WorkerId};

/// Errors from thread pool operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The OS refused to create a thread.
    #[error("Failed to spawn worker thread: {reason}")]
    SpawnFailed { reason: String },

    /// The worker never left `Init` within the start window.
    #[error("Worker #{id} did not start in time")]
    StartTimeout { id: WorkerId },

    /// The worker failed before it could be observed running.
    #[error("Worker #{id} failed during start-up")]
    StartFailed { id: WorkerId },

    #[error("Unknown worker #{id}")]
    UnknownWorker { id: WorkerId },

    #[error("Worker #{id} is not running (state: {state})")]
    NotRunning { id: WorkerId, state: ThreadState },

    /// Only Quit and PanicStop may be sent to a worker.
    #[error("Signal '{signal}' cannot be sent to a worker")]
    InvalidSignal { signal: Signal },

    #[error("Invalid worker transition from {from} on {event}")]
    InvalidTransition {
        from: WorkerLifecycle,
        event: LifecycleEvent,
    },

    /// Workers still alive after the PanicStop window expired.
    #[error("Failed to stop {} worker(s): {:?}", .ids.len(), .ids)]
    StopTimeout { ids: Vec<WorkerId> },
}
