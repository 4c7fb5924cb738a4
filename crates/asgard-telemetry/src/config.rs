//! Telemetry configuration from environment variables.

use std::env;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVICE_NAME: &str = "asgard";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// How log events are rendered and filtered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,

    /// Filter directive used when `RUST_LOG` is unset (e.g. `info`,
    /// `ag_05_server=debug,info`)
    pub log_level: String,

    /// Whether to write events to stdout at all
    pub console_output: bool,

    /// JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

/// `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`, case-insensitive.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `AG_SERVICE_NAME`: Service name (default: asgard)
    /// - `AG_LOG_LEVEL`: Filter directive (default: info)
    /// - `AG_CONSOLE_OUTPUT`: Enable stdout output (default: true)
    /// - `AG_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Self::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            service_name: lookup("AG_SERVICE_NAME")
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.service_name),

            log_level: lookup("AG_LOG_LEVEL")
                .filter(|level| !level.trim().is_empty())
                .unwrap_or(defaults.log_level),

            console_output: lookup("AG_CONSOLE_OUTPUT")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.console_output),

            json_logs: lookup("AG_JSON_LOGS")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.json_logs),
        }
    }
}
