//! # Server State Machine
//!
//! ```text
//! Init ──start──► Running ──stop──► Shutdown ──► Stopped
//!   │                │                  │
//!   └──────────────► Error ◄────────────┘
//! ```
//!
//! `Error` is terminal; a server in `Error` must be rebuilt.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerState {
    Init,
    Running,
    Shutdown,
    Stopped,
    Error,
}

impl ServerState {
    /// Whether the server may move from `self` to `next`.
    pub fn can_transition_to(self, next: ServerState) -> bool {
        matches!(
            (self, next),
            (ServerState::Init, ServerState::Running)
                | (ServerState::Running, ServerState::Shutdown)
                | (ServerState::Shutdown, ServerState::Stopped)
                | (ServerState::Init, ServerState::Error)
                | (ServerState::Running, ServerState::Error)
                | (ServerState::Shutdown, ServerState::Error)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ServerState::Stopped | ServerState::Error)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerState::Init => write!(f, "Init"),
            ServerState::Running => write!(f, "Running"),
            ServerState::Shutdown => write!(f, "Shutdown"),
            ServerState::Stopped => write!(f, "Stopped"),
            ServerState::Error => write!(f, "Error"),
        }
    }
}
