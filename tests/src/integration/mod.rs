//! Integration tests spanning several crates.

pub mod e2e_server;
pub mod flows;
