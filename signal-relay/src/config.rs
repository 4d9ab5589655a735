//! Configuration loading for signal-relay.
//!
//! Configuration is loaded from a TOML file (`--config signal.toml`); every
//! field has a default so the server also runs with no file at all. The
//! `PORT` environment variable overrides the configured listen port, which
//! is how deployment platforms hand us one.

use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration for signal-relay.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Frame limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Liveness sweeper configuration.
    #[serde(default)]
    pub sweeper: SweeperConfig,
    /// Periodic stats logging configuration.
    #[serde(default)]
    pub stats: StatsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the WebSocket listener (default: 0.0.0.0:3000).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Frame limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum inbound WebSocket message size in bytes (default: 1MB).
    /// Oversized frames fail the read and close the offending connection.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

/// Liveness sweeper configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Sweep interval in seconds (default: 60).
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
    /// Maximum silence before a peer is presumed dead (default: 5 minutes).
    #[serde(default = "default_liveness_timeout")]
    pub liveness_timeout_secs: u64,
    /// Maximum age of a buffered message before it is discarded unread
    /// (default: 24 hours).
    #[serde(default = "default_message_ttl")]
    pub message_ttl_secs: u64,
    /// Enable the sweeper task (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Periodic stats logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    /// Stats logging interval in seconds (default: 5 minutes).
    #[serde(default = "default_stats_interval")]
    pub interval_secs: u64,
    /// Enable the stats task (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_max_frame_bytes() -> usize {
    1024 * 1024 // 1MB
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_liveness_timeout() -> u64 {
    5 * 60
}

fn default_message_ttl() -> u64 {
    24 * 60 * 60
}

fn default_stats_interval() -> u64 {
    5 * 60
}

fn default_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval(),
            liveness_timeout_secs: default_liveness_timeout(),
            message_ttl_secs: default_message_ttl(),
            enabled: default_enabled(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_stats_interval(),
            enabled: default_enabled(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            limits: LimitsConfig::default(),
            sweeper: SweeperConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Apply environment overrides: `PORT` replaces the listen port.
    pub fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.server.set_port(port),
                Err(_) => {
                    tracing::warn!(value = %port, "ignoring non-numeric PORT override");
                }
            }
        }
    }
}

impl ServerConfig {
    /// Replace the port part of the bind address.
    pub fn set_port(&mut self, port: u16) {
        let host = self
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("0.0.0.0");
        self.bind_address = format!("{host}:{port}");
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
