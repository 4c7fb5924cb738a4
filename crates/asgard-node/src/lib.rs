//! # Asgard Node
//!
//! Runs an ag-05 server with the built-in line protocol.
//!
//! ## Modular Structure
//!
//! - `container/` - Node configuration from `AG_*` variables
//! - `handlers/` - The line protocol (`ping`, `echo`, `status`, echo-all)
//! - `operator` - Commands read from stdin by the binary
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Install logging
//! 3. Build the dispatcher, enable the response cache when configured
//! 4. Build the server and register the protocol
//! 5. Start the server, then serve operator commands until `quit`

pub mod container;
pub mod handlers;
pub mod operator;

use std::net::SocketAddr;
use std::sync::Arc;

use ag_04_transaction_dispatch::TransactionDispatcher;
use ag_05_server::{Server, ServerState};
use anyhow::{Context, Result};
use tracing::info;

pub use container::{CacheSettings, ConfigError, NodeConfig};
pub use operator::{OperatorCommand, HELP};

/// A configured server and the dispatcher it hosts.
pub struct NodeRuntime {
    config: NodeConfig,
    dispatcher: Arc<TransactionDispatcher>,
    server: Arc<Server>,
}

impl NodeRuntime {
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate().context("Invalid node configuration")?;
        info!(server = %config.server.name, "Creating Asgard node runtime");

        let dispatcher = TransactionDispatcher::new();
        if config.cache.enabled {
            dispatcher
                .enable_cache(config.cache.config.clone())
                .context("Failed to enable the response cache")?;
        }

        let server = Arc::new(
            Server::new(config.server.clone()).context("Failed to create the server")?,
        );
        handlers::register_protocol(&dispatcher, Arc::downgrade(&server))
            .context("Failed to register protocol handlers")?;

        let dispatcher = Arc::new(dispatcher);
        server
            .set_transaction_manager(Arc::clone(&dispatcher))
            .context("Failed to attach the dispatcher")?;

        Ok(Self {
            config,
            dispatcher,
            server,
        })
    }

    /// Start serving. Returns the bound address.
    pub fn start(&self) -> Result<SocketAddr> {
        info!("===========================================");
        info!("  Asgard Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let address = self.server.start().context("Failed to start the server")?;

        let threads = &self.config.server.threads;
        info!("Listening: {}", address);
        info!("Threads: {}..{}", threads.min_threads, threads.max_threads);
        info!("Cache: {}", if self.config.cache.enabled { "enabled" } else { "disabled" });
        if self.config.server.packets.enabled {
            info!("Packet dump: {:?}", self.config.server.packets.path);
        }
        Ok(address)
    }

    /// Stop the server if it is running.
    pub fn shutdown(&self) -> Result<()> {
        if self.server.state() != ServerState::Running {
            return Ok(());
        }
        info!("Shutting down Asgard node");
        self.server.stop().context("Server did not stop cleanly")?;
        info!("Asgard node stopped");
        Ok(())
    }

    /// Status entries rendered one per line as `name: value`.
    pub fn status_report(&self) -> Result<String> {
        let entries = self
            .server
            .get_status()
            .context("Status is only available while running")?;
        let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
        Ok(entries
            .iter()
            .map(|e| format!("{:width$}  {}", e.name, e.value))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    pub fn dispatcher(&self) -> &Arc<TransactionDispatcher> {
        &self.dispatcher
    }
}
