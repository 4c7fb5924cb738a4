//! # Domain Errors
//!
//! [`ServerError`] is returned by server operations. [`ServerErrorKind`] is
//! the fixed table of connection-level failures the server counts while
//! running; those are never returned to callers.

use std::fmt;
use std::io;
use std::path::PathBuf;

use ag_02_thread_pool::PoolError;
use ag_04_transaction_dispatch::TransactionError;
use serde::Serialize;
use thiserror::Error;

use super::state::ServerState;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Operation requires server state {required}, but server is {state}")]
    InvalidState {
        state: ServerState,
        required: ServerState,
    },

    #[error("Invalid server configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("No transaction manager has been set")]
    MissingTransactionManager,

    #[error("Socket error on {address}: {source}")]
    Socket {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open packet dump file {}: {source}", .path.display())]
    PacketDump {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Thread pool failure: {0}")]
    Pool(#[from] PoolError),
}

impl ServerError {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        ServerError::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Connection-level failure kinds counted by a running server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ServerErrorKind {
    Total,
    SocketAccept,
    SocketRead,
    SocketWrite,
    SocketClose,
    SocketTimeout,
    Transaction,
}

impl ServerErrorKind {
    pub const ALL: [ServerErrorKind; 7] = [
        ServerErrorKind::Total,
        ServerErrorKind::SocketAccept,
        ServerErrorKind::SocketRead,
        ServerErrorKind::SocketWrite,
        ServerErrorKind::SocketClose,
        ServerErrorKind::SocketTimeout,
        ServerErrorKind::Transaction,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ServerErrorKind::Total => "Total",
            ServerErrorKind::SocketAccept => "Socket Accept",
            ServerErrorKind::SocketRead => "Socket Read",
            ServerErrorKind::SocketWrite => "Socket Write",
            ServerErrorKind::SocketClose => "Socket Close",
            ServerErrorKind::SocketTimeout => "Socket Timeout",
            ServerErrorKind::Transaction => "Transaction",
        }
    }

    /// Status key, e.g. `errorSocketRead`.
    pub fn key(self) -> String {
        format!("error{}", self.name().replace(' ', ""))
    }
}

impl From<TransactionError> for ServerErrorKind {
    fn from(error: TransactionError) -> Self {
        match error {
            TransactionError::Read => ServerErrorKind::SocketRead,
            TransactionError::Write => ServerErrorKind::SocketWrite,
            TransactionError::Close => ServerErrorKind::SocketClose,
            TransactionError::Timeout => ServerErrorKind::SocketTimeout,
            _ => ServerErrorKind::Transaction,
        }
    }
}

impl fmt::Display for ServerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-kind error counters. Recording any kind also bumps `Total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerErrorCounts {
    counters: [u64; 7],
}

impl ServerErrorCounts {
    pub(crate) fn record(&mut self, kind: ServerErrorKind) {
        if kind == ServerErrorKind::Total {
            return;
        }
        self.counters[ServerErrorKind::Total.index()] += 1;
        self.counters[kind.index()] += 1;
    }

    pub fn get(&self, kind: ServerErrorKind) -> u64 {
        self.counters[kind.index()]
    }

    pub fn total(&self) -> u64 {
        self.get(ServerErrorKind::Total)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ServerErrorKind, u64)> + '_ {
        ServerErrorKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }
}
