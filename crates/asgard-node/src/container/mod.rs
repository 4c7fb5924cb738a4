//! # Node Container
//!
//! Configuration and wiring for the pieces a node runs: the transaction
//! dispatcher with its handlers and the server that feeds it connections.

pub mod config;

pub use config::{CacheSettings, ConfigError, NodeConfig};
