//! # Transaction Dispatch (ag-04)
//!
//! Routes binary requests read off a connection to registered handlers,
//! optionally answering repeated requests from a managed cache.
//!
//! ## Transaction Flow
//!
//! ```text
//! receive ──► identify ──► cache lookup ──hit──────────────┐
//!                              │ miss                       │
//!                              ▼                            ▼
//!                     route (id, then "default")  ──►  send ──► release
//!                              │                            ▲
//!                              ▼                            │
//!                        handler ──► cache store ───────────┘
//! ```
//!
//! Every step is a strategy behind a port trait, so a protocol adapter
//! (HTTP, a line protocol, a length-prefixed codec) replaces only the steps
//! it cares about.
//!
//! ## Error Taxonomy
//!
//! | Code | Kind | Raised when |
//! |------|------|-------------|
//! | -1 | Invalid Args | a strategy rejects its input |
//! | -2 | Read | the connection failed before any bytes arrived |
//! | -3 | Identification | no routing key could be extracted |
//! | -4 | Missing Handler | no handler for the key and no `default` |
//! | -5 | Invalid Handler | the handler panicked |
//! | -6 | Null Result | the handler returned no response |
//! | -7 | Invalid Result | the response cannot be sent (e.g. empty) |
//! | -8 | Write | the connection failed while sending |
//! | -9 | Close | the connection failed to close |
//! | -10 | Timeout | nothing arrived within the receive window |
//!
//! Each failure is counted by kind and in a running total; see
//! [`TransactionDispatcher::error_counts`].
//!
//! ## Caching
//!
//! With the cache enabled, responses are stored under the request hash and
//! served to later requests with the same hash without running the handler.
//! Two concurrent misses on the same hash may both run the handler; the
//! first response stored is the one later hits see.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{
    register_symbol_table, unregister_symbol_table, ChunkedReceiver, DeepClone,
    DefaultIdentifier, EchoHandler, LineIdentifier, PlainSender, Sha256Hash, Symbol, SymbolTable,
};
pub use domain::{
    DispatchError, ErrorCounts, ExecuteOutcome, Request, Response, TransactionError,
    TransactionMetrics, DEFAULT_MESSAGE_ID, ERROR_SLOTS,
};
pub use ports::{
    CloneStrategy, Connection, HashStrategy, IdentifyStrategy, PacketDump, ReceiveStrategy,
    ReleaseStrategy, SendStrategy, TransactionHandler,
};
pub use service::TransactionDispatcher;

// Re-exported so callers can configure the response cache without a
// direct dependency on the cache crate.
pub use ag_03_managed_cache::CacheConfig;
