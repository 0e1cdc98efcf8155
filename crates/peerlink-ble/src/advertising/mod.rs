//! Peripheral-role support: advertising and the handshake GATT service
//!
//! btleplug only covers the central role, so announcing this device needs a
//! platform backend. Linux uses BlueZ through `bluer`; everywhere else the
//! fallback reports advertising as unsupported.

pub mod fallback;
#[cfg(target_os = "linux")]
pub mod linux;

use peerlink_core::AdvertisingParameters;

use crate::error::BleRadioError;

// ----------------------------------------------------------------------------
// Cross-platform Advertising Trait
// ----------------------------------------------------------------------------

/// Trait for BLE advertising functionality across different platforms
#[async_trait::async_trait]
pub trait BleAdvertiser: Send + Sync {
    /// Prepare the backend, returning whether the adapter is powered
    async fn initialize(&mut self, power_on: bool) -> Result<bool, BleRadioError>;

    /// Whether this backend can advertise at all
    fn supports_advertising(&self) -> bool;

    /// Start advertising with the given parameters
    async fn start_advertising(&mut self, params: &AdvertisingParameters) -> Result<(), BleRadioError>;

    /// Stop advertising
    async fn stop_advertising(&mut self) -> Result<(), BleRadioError>;

    /// Check if currently advertising
    fn is_advertising(&self) -> bool;
}

// ----------------------------------------------------------------------------
// Platform Detection and Factory
// ----------------------------------------------------------------------------

/// Platform-specific advertiser enum
pub enum PlatformAdvertiser {
    #[cfg(target_os = "linux")]
    Linux(linux::LinuxAdvertiser),
    #[allow(dead_code)]
    Fallback(fallback::FallbackAdvertiser),
}

impl PlatformAdvertiser {
    /// Create the appropriate advertiser for the current platform
    pub fn new() -> Self {
        #[cfg(target_os = "linux")]
        {
            Self::Linux(linux::LinuxAdvertiser::new())
        }
        #[cfg(not(target_os = "linux"))]
        {
            Self::Fallback(fallback::FallbackAdvertiser::new())
        }
    }
}

impl Default for PlatformAdvertiser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BleAdvertiser for PlatformAdvertiser {
    async fn initialize(&mut self, power_on: bool) -> Result<bool, BleRadioError> {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(ref mut advertiser) => advertiser.initialize(power_on).await,
            Self::Fallback(ref mut advertiser) => advertiser.initialize(power_on).await,
        }
    }

    fn supports_advertising(&self) -> bool {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(ref advertiser) => advertiser.supports_advertising(),
            Self::Fallback(ref advertiser) => advertiser.supports_advertising(),
        }
    }

    async fn start_advertising(&mut self, params: &AdvertisingParameters) -> Result<(), BleRadioError> {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(ref mut advertiser) => advertiser.start_advertising(params).await,
            Self::Fallback(ref mut advertiser) => advertiser.start_advertising(params).await,
        }
    }

    async fn stop_advertising(&mut self) -> Result<(), BleRadioError> {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(ref mut advertiser) => advertiser.stop_advertising().await,
            Self::Fallback(ref mut advertiser) => advertiser.stop_advertising().await,
        }
    }

    fn is_advertising(&self) -> bool {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(ref advertiser) => advertiser.is_advertising(),
            Self::Fallback(ref advertiser) => advertiser.is_advertising(),
        }
    }
}
