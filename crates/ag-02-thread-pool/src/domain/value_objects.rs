//! # Value Objects
//!
//! Classic thread state, status and signal names, plus the timing policy
//! used when stopping workers.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifier handed out by [`crate::ThreadPool::spawn`]. Never reused
/// within one pool.
pub type WorkerId = usize;

/// Coarse lifecycle state of a worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadState {
    Init,
    Running,
    Halt,
    Stopped,
    Error,
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadState::Init => write!(f, "Init"),
            ThreadState::Running => write!(f, "Running"),
            ThreadState::Halt => write!(f, "Halt"),
            ThreadState::Stopped => write!(f, "Stopped"),
            ThreadState::Error => write!(f, "Error"),
        }
    }
}

/// What a running worker is doing right now. Busy workers count toward the
/// active ratio the server uses to grow and shrink its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadStatus {
    Init,
    Busy,
    Napping,
    Error,
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadStatus::Init => write!(f, "Init"),
            ThreadStatus::Busy => write!(f, "Busy"),
            ThreadStatus::Napping => write!(f, "Napping"),
            ThreadStatus::Error => write!(f, "Error"),
        }
    }
}

/// Cooperative cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Ok,
    Quit,
    PanicStop,
    Error,
}

impl Signal {
    fn severity(self) -> u8 {
        match self {
            Signal::Ok => 0,
            Signal::Quit => 1,
            Signal::PanicStop => 2,
            Signal::Error => 3,
        }
    }

    /// Whether a worker currently at `current` may be moved to `self`.
    /// Only Quit and PanicStop can be sent, and never to de-escalate.
    pub fn escalates(self, current: Signal) -> bool {
        matches!(self, Signal::Quit | Signal::PanicStop)
            && current != Signal::Error
            && self.severity() >= current.severity()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Ok => write!(f, "Ok"),
            Signal::Quit => write!(f, "Quit"),
            Signal::PanicStop => write!(f, "Panic Stop"),
            Signal::Error => write!(f, "Error"),
        }
    }
}

/// Polling windows for starting and stopping workers.
///
/// Stopping escalates Halt -> Quit -> PanicStop, waiting up to the matching
/// window at each step before escalating further.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopPolicy {
    pub poll_interval: Duration,
    pub start_window: Duration,
    pub halt_grace: Duration,
    pub quit_window: Duration,
    pub panic_window: Duration,
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_micros(1024),
            start_window: Duration::from_millis(8192),
            halt_grace: Duration::from_millis(16),
            quit_window: Duration::from_millis(8192),
            panic_window: Duration::from_millis(2048),
        }
    }
}
