//! # Server (ag-05)
//!
//! Threaded TCP server hosting a
//! [`TransactionDispatcher`](ag_04_transaction_dispatch::TransactionDispatcher).
//!
//! ## Threads
//!
//! | Role | Count | Loop |
//! |------|-------|------|
//! | worker | `min_threads..=max_threads` | accept, execute until the handler releases the connection, close |
//! | manager | 1 | roll tracking window, reap, grow/shrink pool, drain console, nap 128 ms |
//!
//! The manager spawns a worker while fewer than `min_threads` are live, or
//! while at least 85% of live workers are busy and the pool is below
//! `max_threads`. With shrinking enabled it retires one idle worker per
//! cycle while fewer than 35% are busy and the pool is above `min_threads`.
//!
//! ## Lifecycle
//!
//! `Init -> Running -> Shutdown -> Stopped`, or `Error` on a bind or pool
//! failure. Configuration setters are only accepted in `Init`;
//! [`Server::get_status`] only in `Running`. [`Server::stop`] always leaves
//! the worker pool empty and the socket closed.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod service;

pub use adapters::{ConsoleBuffer, PacketRecorder, ServerSocket, SocketCounters, SocketState};
pub use config::{
    PacketDumpOptions, ServerConfig, SocketConfig, ThreadPoolOptions, Transport,
    DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SERVER_NAME,
};
pub use domain::{
    status_value, Metric, ServerError, ServerErrorCounts, ServerErrorKind, ServerMetrics,
    ServerState, ServerStatusEntry, TrackingWindow, TRACKING_WINDOW,
};
pub use service::Server;
