//! # Node Configuration
//!
//! Server, cache and telemetry settings in one struct, loaded from `AG_*`
//! environment variables over the library defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ag_03_managed_cache::CacheConfig;
use ag_05_server::{ServerConfig, ServerError};
use asgard_telemetry::{parse_flag, TelemetryConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {var} has invalid value '{value}': expected {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("Invalid cache configuration: {0}")]
    Cache(String),
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub config: CacheConfig,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            config: CacheConfig::default(),
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub server: ServerConfig,
    pub cache: CacheSettings,
    pub telemetry: TelemetryConfig,
}

/// Typed reads of optional variables through a lookup function.
struct EnvReader<L> {
    lookup: L,
}

impl<L: Fn(&str) -> Option<String>> EnvReader<L> {
    fn string(&self, var: &'static str) -> Option<String> {
        (self.lookup)(var).filter(|value| !value.trim().is_empty())
    }

    fn parse<T: FromStr>(
        &self,
        var: &'static str,
        expected: &'static str,
    ) -> Result<Option<T>, ConfigError> {
        self.string(var)
            .map(|value| {
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        var,
                        value: value.clone(),
                        expected,
                    })
            })
            .transpose()
    }

    fn flag(&self, var: &'static str) -> Result<Option<bool>, ConfigError> {
        self.string(var)
            .map(|value| {
                parse_flag(&value).ok_or(ConfigError::InvalidValue {
                    var,
                    value: value.clone(),
                    expected: "a boolean",
                })
            })
            .transpose()
    }
}

impl NodeConfig {
    /// Load configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `AG_HOST`, `AG_PORT`, `AG_SERVER_NAME`
    /// - `AG_MIN_THREADS`, `AG_MAX_THREADS`, `AG_SHRINK_ENABLED`
    /// - `AG_CACHE_ENABLED`, `AG_CACHE_MAX_ITEMS`, `AG_CACHE_MAX_MEMORY`,
    ///   `AG_CACHE_TTL_SECS`
    /// - `AG_DUMP_PACKETS`, `AG_DUMP_PATH`, `AG_DUMP_FILENAME`,
    ///   `AG_DUMP_INDIVIDUAL_FILES`, `AG_DUMP_HEADERS`
    /// - telemetry variables, see [`TelemetryConfig::from_env`]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let telemetry = TelemetryConfig::from_lookup(&lookup);
        let env = EnvReader { lookup };
        let mut config = NodeConfig {
            telemetry,
            ..NodeConfig::default()
        };

        let server = &mut config.server;
        if let Some(host) = env.string("AG_HOST") {
            server.socket.host = host;
        }
        if let Some(port) = env.parse("AG_PORT", "a port number")? {
            server.socket.port = port;
        }
        if let Some(name) = env.string("AG_SERVER_NAME") {
            server.name = name;
        }

        let threads = &mut server.threads;
        if let Some(min) = env.parse("AG_MIN_THREADS", "a thread count")? {
            threads.min_threads = min;
            // Keep the default ceiling valid when only the floor is raised.
            threads.max_threads = threads.max_threads.max(min);
        }
        if let Some(max) = env.parse("AG_MAX_THREADS", "a thread count")? {
            threads.max_threads = max;
        }
        if let Some(shrink) = env.flag("AG_SHRINK_ENABLED")? {
            threads.shrink_enabled = shrink;
        }

        let packets = &mut server.packets;
        if let Some(enabled) = env.flag("AG_DUMP_PACKETS")? {
            packets.enabled = enabled;
        }
        if let Some(path) = env.string("AG_DUMP_PATH") {
            packets.path = PathBuf::from(path);
        }
        if let Some(filename) = env.string("AG_DUMP_FILENAME") {
            packets.filename = filename;
        }
        if let Some(individual) = env.flag("AG_DUMP_INDIVIDUAL_FILES")? {
            packets.individual_files = individual;
        }
        if let Some(headers) = env.flag("AG_DUMP_HEADERS")? {
            packets.headers = headers;
        }

        let cache = &mut config.cache;
        if let Some(enabled) = env.flag("AG_CACHE_ENABLED")? {
            cache.enabled = enabled;
        }
        if let Some(items) = env.parse("AG_CACHE_MAX_ITEMS", "an item count")? {
            cache.config.max_items = items;
        }
        if let Some(bytes) = env.parse("AG_CACHE_MAX_MEMORY", "a byte count")? {
            cache.config.max_memory = bytes;
        }
        if let Some(secs) = env.parse::<u64>("AG_CACHE_TTL_SECS", "seconds")? {
            cache.config.ttl = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        if self.cache.enabled {
            self.cache
                .config
                .validate()
                .map_err(|e| ConfigError::Cache(e.to_string()))?;
        }
        Ok(())
    }
}
