//! Core configuration

use std::time::Duration;

use crate::errors::{PeerlinkError, Result};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for a peer link node
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PeerlinkConfig {
    /// Name announced in the advertising payload; the radio's own name when unset
    pub device_name: Option<String>,
    /// Unlinked peers unseen for this long are evicted when a scan session ends
    pub stale_peer_timeout_secs: u64,
}

impl Default for PeerlinkConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            stale_peer_timeout_secs: 30,
        }
    }
}

impl PeerlinkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the advertised device name
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    /// Set the stale-peer eviction age
    pub fn with_stale_peer_timeout(mut self, timeout: Duration) -> Self {
        self.stale_peer_timeout_secs = timeout.as_secs();
        self
    }

    pub fn stale_peer_timeout(&self) -> Duration {
        Duration::from_secs(self.stale_peer_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.device_name {
            if name.is_empty() {
                return Err(PeerlinkError::config("device_name must not be empty"));
            }
            // 31-byte legacy payload minus flags and the 128-bit service UUID
            if name.len() > 8 {
                return Err(PeerlinkError::config(format!(
                    "device_name '{}' does not fit the advertising payload (max 8 bytes)",
                    name
                )));
            }
        }
        if self.stale_peer_timeout_secs == 0 {
            return Err(PeerlinkError::config(
                "stale_peer_timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }
}
