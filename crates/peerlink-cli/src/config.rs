//! PeerLink CLI Configuration Management
//!
//! Configuration is layered with figment, lowest priority first:
//! - Default values
//! - `peerlink.toml` in the working directory
//! - The file given with `--config`
//! - Environment variables (`PEERLINK_*`, sections separated by `__`,
//!   e.g. `PEERLINK_NODE__DEVICE_NAME`)

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use peerlink_ble::BleRadioConfig;
use peerlink_core::PeerlinkConfig;

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the PeerLink CLI application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Node behavior (advertised name, eviction)
    pub node: PeerlinkConfig,

    /// BLE adapter selection and link settings
    pub ble: BleRadioConfig,

    /// CLI-specific configuration
    pub cli: CliConfig,
}

/// CLI-specific configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Enable verbose logging output
    pub verbose: bool,

    /// Print the discovered-device list when the node stops
    pub list_on_exit: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            list_on_exit: true,
        }
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Name of the configuration file picked up from the working directory
    pub const DEFAULT_FILE: &'static str = "peerlink.toml";

    /// Load configuration with the standard priority order
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(Self::DEFAULT_FILE));

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileSystem(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        Self::extract(figment.merge(Env::prefixed("PEERLINK_").split("__")))
    }

    /// Extract and validate a configuration from any figment
    pub fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| ConfigError::Loading(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.node
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        if self.ble.connection_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "BLE connection timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("File system error: {0}")]
    FileSystem(String),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
