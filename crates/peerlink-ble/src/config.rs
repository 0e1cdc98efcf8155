//! BLE radio configuration

use std::time::Duration;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the BLE radio adapter
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BleRadioConfig {
    /// Index into the host's adapter list
    pub adapter_index: usize,
    /// Power the adapter on if it is off (Linux only)
    pub power_on_adapter: bool,
    /// Give up on a link-open after this long and report it as failed
    pub connection_timeout: Duration,
}

impl Default for BleRadioConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            power_on_adapter: true,
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl BleRadioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a specific adapter
    pub fn with_adapter_index(mut self, index: usize) -> Self {
        self.adapter_index = index;
        self
    }

    /// Enable or disable powering on the adapter at startup
    pub fn with_power_on_adapter(mut self, enabled: bool) -> Self {
        self.power_on_adapter = enabled;
        self
    }

    /// Set connection timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = BleRadioConfig::new()
            .with_adapter_index(1)
            .with_power_on_adapter(false)
            .with_connection_timeout(Duration::from_secs(3));

        assert_eq!(config.adapter_index, 1);
        assert!(!config.power_on_adapter);
        assert_eq!(config.connection_timeout, Duration::from_secs(3));
    }
}
