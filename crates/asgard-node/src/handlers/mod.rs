//! # Protocol Handlers
//!
//! The line protocol a node answers out of the box.

pub mod protocol;

pub use protocol::*;
