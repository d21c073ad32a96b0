//! # Configuration Management
//!
//! Centralized configuration for the session layer.
//!
//! This module provides structured configuration for the listening hub and
//! dialing peers, including bind/dial addressing, the registered-identifier
//! set, and logging options.
//!
//! ## Configuration Sources
//! - TOML files via `from_toml_file()`
//! - Direct instantiation with defaults
//!
//! The defaults match the link-formation layer this crate was built against:
//! the hub owns `192.168.49.1` and listens on port 9999.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Port the hub binds and peers dial.
pub const DEFAULT_PORT: u16 = 9999;

/// Address the hub binds when it owns the link.
pub const DEFAULT_BIND_ADDR: &str = "192.168.49.1";

/// Max allowed size of a single wire record, in bytes. A record is one line;
/// anything longer is treated as a transport fault for that connection.
pub const MAX_RECORD_SIZE: usize = 64 * 1024;

/// Upper bound (exclusive) of the challenge value space.
pub const CHALLENGE_SPACE: u32 = 1_000_000;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NetworkConfig {
    /// Hub-specific configuration
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Dialing-peer configuration
    #[serde(default)]
    pub dialer: DialerConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration for the listening hub
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    /// Address to bind
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

/// Configuration for a dialing peer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DialerConfig {
    /// Address of the hub to dial
    #[serde(default = "default_bind_addr")]
    pub hub_addr: String,

    /// Port of the hub to dial
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            hub_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuthConfig {
    /// Registered identifiers accepted by the hub. Read-only input owned by
    /// the surrounding application; peers claiming anything else are refused.
    #[serde(default)]
    pub registered_ids: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter (`error`, `warn`, `info`, `debug`, `trace`)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

impl NetworkConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path.as_ref()).map_err(|e| {
            ProtocolError::ConfigError(format!(
                "Failed to open config file {}: {e}",
                path.as_ref().display()
            ))
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        toml::from_str(&contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse config file: {e}")))
    }

    /// Socket address string the hub binds.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listener.bind_addr, self.listener.port)
    }

    /// Socket address string a peer dials.
    pub fn dial_addr(&self) -> String {
        format!("{}:{}", self.dialer.hub_addr, self.dialer.port)
    }
}
