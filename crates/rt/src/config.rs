//! Configuration file support for rt
//!
//! Loads and validates settings from a TOML file.
//! Default location: /etc/vrouter/rt.toml

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use vrouter_types::AddressFamily;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/vrouter/rt.toml";

/// Netlink transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Generic netlink family registered by the vrouter module
    #[serde(default = "default_family_name")]
    pub family_name: String,

    /// Receive timeout in milliseconds; 0 waits forever
    #[serde(default = "default_receive_timeout")]
    pub receive_timeout_ms: u64,

    /// Size of the receive buffer in bytes
    #[serde(default = "default_receive_buffer_size")]
    pub receive_buffer_size: usize,
}

/// Defaults for command line parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Table used when neither -f nor --family is given
    #[serde(default)]
    pub family: AddressFamily,
}

/// Complete rt configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtConfig {
    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

fn default_family_name() -> String {
    "vrouter".to_string()
}

fn default_receive_timeout() -> u64 {
    5000
}

fn default_receive_buffer_size() -> usize {
    // room for a full dump batch
    64 * 1024
}

/// Smallest receive buffer that still fits one netlink message with a frame.
const MIN_RECEIVE_BUFFER: usize = 4096;

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            family_name: default_family_name(),
            receive_timeout_ms: default_receive_timeout(),
            receive_buffer_size: default_receive_buffer_size(),
        }
    }
}

impl TransportConfig {
    /// Receive timeout, `None` when disabled
    pub fn receive_timeout(&self) -> Option<Duration> {
        (self.receive_timeout_ms > 0).then(|| Duration::from_millis(self.receive_timeout_ms))
    }
}

impl RtConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => {
                let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source: e,
            }),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.family_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "transport.family_name",
                message: "must not be empty".to_string(),
            });
        }

        if self.transport.receive_buffer_size < MIN_RECEIVE_BUFFER {
            return Err(ConfigError::Invalid {
                field: "transport.receive_buffer_size",
                message: format!("must be at least {MIN_RECEIVE_BUFFER} bytes"),
            });
        }

        Ok(())
    }
}
