//! # Asgard Telemetry
//!
//! Logging bootstrap shared by Asgard binaries. Library crates only emit
//! `tracing` events; a binary calls [`init_logging`] once at startup.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use asgard_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&TelemetryConfig::from_env())?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG` | - | Filter directive; overrides `AG_LOG_LEVEL` |
//! | `AG_LOG_LEVEL` | `info` | Filter directive |
//! | `AG_JSON_LOGS` | `false` | JSON lines instead of readable output |
//! | `AG_CONSOLE_OUTPUT` | `true` | Write events to stdout |
//! | `AG_SERVICE_NAME` | `asgard` | Service name on the startup event |

mod config;
mod logging;

pub use config::{parse_flag, TelemetryConfig, DEFAULT_LOG_LEVEL, DEFAULT_SERVICE_NAME};
pub use logging::{build_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{directive}': {reason}")]
    Filter { directive: String, reason: String },

    /// A global subscriber was already installed.
    #[error("Failed to install log subscriber: {0}")]
    SubscriberInit(String),
}
