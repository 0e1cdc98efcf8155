//! Radio protocol constants and the fixed advertise/scan parameters

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Service and Characteristic UUIDs
// ----------------------------------------------------------------------------

/// Service identifier shared by advertisers and scanners
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x00001234_0000_1000_8000_00805F9B34FB);

/// Characteristic exposed under [`SERVICE_UUID`] for the handshake exchange
pub const HANDSHAKE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x00001235_0000_1000_8000_00805F9B34FB);

// ----------------------------------------------------------------------------
// Advertising Parameters
// ----------------------------------------------------------------------------

/// Requested transmit power for advertising
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxPowerLevel {
    UltraLow,
    Low,
    Medium,
    High,
}

impl TxPowerLevel {
    /// Nominal output power in dBm
    pub fn dbm(&self) -> i16 {
        match self {
            TxPowerLevel::UltraLow => -21,
            TxPowerLevel::Low => -15,
            TxPowerLevel::Medium => -7,
            TxPowerLevel::High => 1,
        }
    }
}

/// Contents of the scan-response payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResponse {
    /// Carry transmit-power metadata
    pub include_tx_power_level: bool,
}

/// Everything a radio needs to start announcing this device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertisingParameters {
    pub connectable: bool,
    /// `None` advertises until explicitly stopped
    pub timeout: Option<Duration>,
    pub tx_power: TxPowerLevel,
    /// Include the device identity (name) in the advertising payload
    pub include_device_name: bool,
    /// Local name override; the radio's own name is used when absent
    pub local_name: Option<String>,
    pub service_uuid: Uuid,
    pub scan_response: ScanResponse,
}

impl AdvertisingParameters {
    /// The fixed handshake advertisement: connectable, infinite, high power
    pub fn handshake(local_name: Option<String>) -> Self {
        Self {
            connectable: true,
            timeout: None,
            tx_power: TxPowerLevel::High,
            include_device_name: true,
            local_name,
            service_uuid: SERVICE_UUID,
            scan_response: ScanResponse {
                include_tx_power_level: true,
            },
        }
    }
}

// ----------------------------------------------------------------------------
// Scan Parameters
// ----------------------------------------------------------------------------

/// Scan duty cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanMode {
    LowPower,
    Balanced,
    /// Aggressive duty cycle, favors fast discovery over power
    LowLatency,
}

/// Filter applied by the radio to incoming advertisements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFilter {
    pub service_uuid: Uuid,
}

impl ScanFilter {
    /// The fixed handshake filter on [`SERVICE_UUID`]
    pub const HANDSHAKE: ScanFilter = ScanFilter {
        service_uuid: SERVICE_UUID,
    };

    pub fn matches(&self, advertised_services: &[Uuid]) -> bool {
        advertised_services.contains(&self.service_uuid)
    }
}
