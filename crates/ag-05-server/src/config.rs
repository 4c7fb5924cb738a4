//! # Server Configuration
//!
//! Everything here is fixed before `start()`; the server rejects changes
//! once it has left `Init`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use ag_02_thread_pool::StopPolicy;
use serde::{Deserialize, Serialize};

use crate::domain::ServerError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9020;
pub const DEFAULT_SERVER_NAME: &str = "Asgard Server";
pub const DEFAULT_MIN_THREADS: usize = 4;
pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_millis(128);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Tcp,
    /// Connectionless; accepted in configuration but rejected by `validate`.
    Udp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp => write!(f, "TCP/IP"),
            Transport::Udp => write!(f, "UDP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    pub host: String,
    /// Zero binds an ephemeral port.
    pub port: u16,
    pub transport: Transport,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            transport: Transport::Tcp,
        }
    }
}

impl SocketConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.host.trim().is_empty() {
            return Err(ServerError::invalid_config("socket host must not be empty"));
        }
        if self.transport != Transport::Tcp {
            return Err(ServerError::invalid_config(format!(
                "transport {} is not supported by the connection server",
                self.transport
            )));
        }
        Ok(())
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadPoolOptions {
    /// Allow the manager to retire idle workers above `min_threads`.
    pub shrink_enabled: bool,
    pub min_threads: usize,
    pub max_threads: usize,
}

impl Default for ThreadPoolOptions {
    fn default() -> Self {
        Self {
            shrink_enabled: true,
            min_threads: DEFAULT_MIN_THREADS,
            max_threads: (num_cpus::get() * 4).max(DEFAULT_MIN_THREADS),
        }
    }
}

impl ThreadPoolOptions {
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.min_threads < 1 || self.max_threads < 1 {
            return Err(ServerError::invalid_config(
                "thread pool bounds must be at least 1",
            ));
        }
        if self.min_threads > self.max_threads {
            return Err(ServerError::invalid_config(format!(
                "min_threads ({}) exceeds max_threads ({})",
                self.min_threads, self.max_threads
            )));
        }
        Ok(())
    }
}

/// Raw packet recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketDumpOptions {
    pub enabled: bool,
    /// One file per packet (`<filename>.<uid>`) instead of one shared file.
    pub individual_files: bool,
    /// Wrap each packet in begin/end delimiter lines.
    pub headers: bool,
    pub path: PathBuf,
    pub filename: String,
}

impl Default for PacketDumpOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            individual_files: false,
            headers: true,
            path: PathBuf::from("."),
            filename: "packets.dump".to_string(),
        }
    }
}

impl PacketDumpOptions {
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.enabled && self.filename.trim().is_empty() {
            return Err(ServerError::invalid_config(
                "packet dump filename must not be empty",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub socket: SocketConfig,
    pub threads: ThreadPoolOptions,
    pub packets: PacketDumpOptions,
    /// Longest a worker blocks in accept before re-checking its signal.
    pub accept_timeout: Duration,
    pub stop_policy: StopPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            socket: SocketConfig::default(),
            threads: ThreadPoolOptions::default(),
            packets: PacketDumpOptions::default(),
            accept_timeout: DEFAULT_ACCEPT_TIMEOUT,
            stop_policy: StopPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.name.trim().is_empty() {
            return Err(ServerError::invalid_config("server name must not be empty"));
        }
        if self.accept_timeout.is_zero() {
            return Err(ServerError::invalid_config("accept_timeout must be non-zero"));
        }
        self.socket.validate()?;
        self.threads.validate()?;
        self.packets.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket.address(), "127.0.0.1:9020");
        assert_eq!(config.name, "Asgard Server");
        assert!(config.threads.max_threads >= config.threads.min_threads);
    }

    #[test]
    fn test_thread_bounds() {
        let inverted = ThreadPoolOptions {
            shrink_enabled: true,
            min_threads: 8,
            max_threads: 2,
        };
        assert!(matches!(
            inverted.validate(),
            Err(ServerError::InvalidConfig { .. })
        ));

        let zero = ThreadPoolOptions {
            min_threads: 0,
            ..ThreadPoolOptions::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_udp_rejected() {
        let socket = SocketConfig {
            transport: Transport::Udp,
            ..SocketConfig::default()
        };
        assert!(socket.validate().is_err());
        assert_eq!(Transport::Tcp.to_string(), "TCP/IP");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"socket": {"port": 0}, "threads": {"min_threads": 1}}"#)
                .unwrap();
        assert_eq!(config.socket.port, 0);
        assert_eq!(config.socket.host, DEFAULT_HOST);
        assert_eq!(config.threads.min_threads, 1);
        assert!(config.threads.shrink_enabled);
    }
}
