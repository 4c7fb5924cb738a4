//! # Worker Lifecycle
//!
//! A worker's state and its pending signal are one value. Every change goes
//! through [`WorkerLifecycle::apply`], whose match arms are the complete
//! transition table:
//!
//! | From | Event | To |
//! |------|-------|----|
//! | `Init` | `Started` | `Running(Ok)` |
//! | `Running(s)` | `Halt` | `Halt(s)` |
//! | `Running(s)` | `Signal(n)`, n escalates s | `Running(n)` |
//! | `Halt(s)` | `Signal(n)`, n escalates s | `Halt(n)` |
//! | `Running(_)` / `Halt(_)` | `Exited` | `Stopped` |
//! | `Init` / `Running(_)` / `Halt(_)` | `Failed` | `Error` |
//!
//! ```text
//!   Init ──Started──► Running(Ok) ──Signal──► Running(Quit|PanicStop)
//!                        │                          │
//!                       Halt                      Exited
//!                        ▼                          ▼
//!                     Halt(s) ───────Exited────► Stopped
//!
//!   any non-terminal ──Failed──► Error
//! ```

use std::fmt;

use super::errors::PoolError;
use super::value_objects::{Signal, ThreadState};

/// Combined state + signal of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerLifecycle {
    Init,
    Running(Signal),
    Halt(Signal),
    Stopped,
    Error,
}

/// Input to the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Started,
    Halt,
    Signal(Signal),
    Exited,
    Failed,
}

impl WorkerLifecycle {
    /// Apply `event`, returning the next lifecycle or an error naming the
    /// rejected transition.
    pub fn apply(self, event: LifecycleEvent) -> Result<Self, PoolError> {
        use LifecycleEvent as E;
        use WorkerLifecycle::*;

        let next = match (self, event) {
            (Init, E::Started) => Running(Signal::Ok),
            (Running(signal), E::Halt) => Halt(signal),
            (Running(current), E::Signal(signal)) if signal.escalates(current) => Running(signal),
            (Halt(current), E::Signal(signal)) if signal.escalates(current) => Halt(signal),
            (Running(_) | Halt(_), E::Exited) => Stopped,
            (Init | Running(_) | Halt(_), E::Failed) => Error,
            (from, event) => return Err(PoolError::InvalidTransition { from, event }),
        };

        Ok(next)
    }

    pub fn state(&self) -> ThreadState {
        match self {
            WorkerLifecycle::Init => ThreadState::Init,
            WorkerLifecycle::Running(_) => ThreadState::Running,
            WorkerLifecycle::Halt(_) => ThreadState::Halt,
            WorkerLifecycle::Stopped => ThreadState::Stopped,
            WorkerLifecycle::Error => ThreadState::Error,
        }
    }

    pub fn signal(&self) -> Signal {
        match self {
            WorkerLifecycle::Running(signal) | WorkerLifecycle::Halt(signal) => *signal,
            WorkerLifecycle::Error => Signal::Error,
            WorkerLifecycle::Init | WorkerLifecycle::Stopped => Signal::Ok,
        }
    }

    /// True only while running with no pending signal.
    pub fn should_run(&self) -> bool {
        matches!(self, WorkerLifecycle::Running(Signal::Ok))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerLifecycle::Stopped | WorkerLifecycle::Error)
    }
}

impl fmt::Display for WorkerLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerLifecycle::Running(signal) | WorkerLifecycle::Halt(signal) => {
                write!(f, "{} ({})", self.state(), signal)
            }
            _ => write!(f, "{}", self.state()),
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Started => write!(f, "started"),
            LifecycleEvent::Halt => write!(f, "halt"),
            LifecycleEvent::Signal(signal) => write!(f, "signal {}", signal),
            LifecycleEvent::Exited => write!(f, "exited"),
            LifecycleEvent::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let lifecycle = WorkerLifecycle::Init
            .apply(LifecycleEvent::Started)
            .unwrap();
        assert!(lifecycle.should_run());

        let lifecycle = lifecycle.apply(LifecycleEvent::Halt).unwrap();
        assert_eq!(lifecycle.state(), ThreadState::Halt);
        assert!(!lifecycle.should_run());

        let lifecycle = lifecycle.apply(LifecycleEvent::Exited).unwrap();
        assert_eq!(lifecycle, WorkerLifecycle::Stopped);
        assert!(lifecycle.is_terminal());
    }

    #[test]
    fn test_signal_escalation_while_halted() {
        let lifecycle = WorkerLifecycle::Halt(Signal::Ok)
            .apply(LifecycleEvent::Signal(Signal::Quit))
            .unwrap()
            .apply(LifecycleEvent::Signal(Signal::PanicStop))
            .unwrap();
        assert_eq!(lifecycle, WorkerLifecycle::Halt(Signal::PanicStop));
        assert_eq!(lifecycle.signal(), Signal::PanicStop);
    }

    #[test]
    fn test_signal_cannot_deescalate() {
        let err = WorkerLifecycle::Running(Signal::PanicStop)
            .apply(LifecycleEvent::Signal(Signal::Quit))
            .unwrap_err();
        assert!(matches!(err, PoolError::InvalidTransition { .. }));
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for event in [
            LifecycleEvent::Started,
            LifecycleEvent::Halt,
            LifecycleEvent::Signal(Signal::Quit),
            LifecycleEvent::Exited,
            LifecycleEvent::Failed,
        ] {
            assert!(WorkerLifecycle::Stopped.apply(event).is_err());
            assert!(WorkerLifecycle::Error.apply(event).is_err());
        }
    }

    #[test]
    fn test_cannot_halt_before_start() {
        assert!(WorkerLifecycle::Init.apply(LifecycleEvent::Halt).is_err());
        assert_eq!(
            WorkerLifecycle::Init.apply(LifecycleEvent::Failed).unwrap(),
            WorkerLifecycle::Error
        );
    }

    #[test]
    fn test_error_projects_error_signal() {
        assert_eq!(WorkerLifecycle::Error.signal(), Signal::Error);
        assert_eq!(WorkerLifecycle::Running(Signal::Quit).to_string(), "Running (Quit)");
    }
}
