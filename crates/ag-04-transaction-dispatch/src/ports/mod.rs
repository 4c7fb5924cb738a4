//! # Ports
//!
//! Seams where protocol adapters plug into the dispatcher. Every strategy
//! trait is implemented for plain closures of the matching shape, so a
//! one-off adapter is a closure and a configurable one is a struct.

pub mod connection;
pub mod strategies;

pub use connection::Connection;
pub use strategies::{
    CloneStrategy, HashStrategy, IdentifyStrategy, PacketDump, ReceiveStrategy, ReleaseStrategy,
    SendStrategy, TransactionHandler,
};
