//! # Configuration Management
//!
//! Centralized configuration for the maildrop server and client.
//!
//! This module provides structured configuration for both sides of the
//! protocol: listen port, target address, identity, and I/O deadlines.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-variable overrides via `from_env()`
//!
//! The permitted listen/connect port range (1024-64000) is owned here;
//! binaries validate before any networking starts.

use crate::error::{MaildropError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Lowest port the server may listen on / the client may target.
pub const MIN_PORT: u16 = 1024;
/// Highest port the server may listen on / the client may target.
pub const MAX_PORT: u16 = 64000;

/// Maximum username length in bytes, mirrored from the wire format.
const MAX_USERNAME_BYTES: usize = 255;

/// Top-level configuration covering both binaries.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct MaildropConfig {
    /// Server-specific configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Client-specific configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MaildropConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| MaildropError::Config(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| MaildropError::Config(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| MaildropError::Config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("MAILDROP_PORT") {
            if let Ok(val) = port.parse::<u16>() {
                config.server.port = val;
                config.client.port = val;
            }
        }

        if let Ok(host) = std::env::var("MAILDROP_HOST") {
            config.client.host = host;
        }

        if let Ok(timeout) = std::env::var("MAILDROP_IO_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.server.io_timeout = Duration::from_millis(val);
                config.client.io_timeout = Duration::from_millis(val);
            }
        }

        Ok(config)
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.client.validate());
        errors
    }
}

/// Server-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on (1024-64000); all interfaces are bound.
    pub port: u16,

    /// Bound on each socket read or write while servicing a connection.
    #[serde(with = "duration_serde")]
    pub io_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9000,
            io_timeout: timeout::DEFAULT_IO_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.port < MIN_PORT || self.port > MAX_PORT {
            errors.push(format!(
                "Port number must be in range {MIN_PORT} - {MAX_PORT} (inclusive), got {}",
                self.port
            ));
        }

        if self.io_timeout.is_zero() {
            errors.push("I/O timeout must be greater than 0".to_string());
        } else if self.io_timeout.as_secs() > 300 {
            errors.push("I/O timeout too long (maximum: 300s)".to_string());
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        strict(self.validate())
    }
}

/// Client-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Server hostname or IP address
    pub host: String,

    /// Server port (1024-64000)
    pub port: u16,

    /// Username the exchange runs under (1-255 UTF-8 bytes)
    pub username: String,

    /// Timeout for establishing the connection
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Bound on each socket read or write during the exchange
    #[serde(with = "duration_serde")]
    pub io_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 9000,
            username: String::new(),
            connect_timeout: timeout::CONNECT_TIMEOUT,
            io_timeout: timeout::DEFAULT_IO_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.host.is_empty() {
            errors.push("Host cannot be empty".to_string());
        }

        if self.port < MIN_PORT || self.port > MAX_PORT {
            errors.push(format!(
                "Port number must be in range {MIN_PORT} - {MAX_PORT} (inclusive), got {}",
                self.port
            ));
        }

        if self.username.is_empty() {
            errors.push("Username must be at least 1 character".to_string());
        } else if self.username.len() > MAX_USERNAME_BYTES {
            errors.push(format!(
                "Username too long: {} bytes (maximum: {MAX_USERNAME_BYTES})",
                self.username.len()
            ));
        }

        if self.connect_timeout.is_zero() || self.io_timeout.is_zero() {
            errors.push("Timeouts must be greater than 0".to_string());
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        strict(self.validate())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
        }
    }
}

fn strict(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(MaildropError::Config(errors.join("; ")))
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
