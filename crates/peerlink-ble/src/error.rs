//! Error types for the BLE radio adapter

use peerlink_core::{ErrorCode, PeerAddress, PeerlinkError};
use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors specific to the BLE radio adapter
#[derive(Error, Debug)]
pub enum BleRadioError {
    #[error("BLE adapter not available")]
    AdapterNotAvailable,

    #[error("BLE advertising not supported on this platform")]
    AdvertisingUnsupported,

    #[error("Peer not found: {peer}")]
    PeerNotFound { peer: PeerAddress },

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Failed to get BLE events: {0}")]
    EventStreamFailed(String),

    #[error("Central error: {0}")]
    Central(#[from] btleplug::Error),

    #[cfg(target_os = "linux")]
    #[error("BlueZ error: {0}")]
    Bluez(#[from] bluer::Error),
}

impl BleRadioError {
    /// Numeric failure code reported to the core
    pub fn code(&self) -> ErrorCode {
        match self {
            BleRadioError::AdapterNotAvailable => ErrorCode::INTERNAL_ERROR,
            BleRadioError::AdvertisingUnsupported => ErrorCode::FEATURE_UNSUPPORTED,
            BleRadioError::PeerNotFound { .. } => ErrorCode::PEER_NOT_FOUND,
            BleRadioError::ConnectionTimeout => ErrorCode::INTERNAL_ERROR,
            BleRadioError::EventStreamFailed(_) => ErrorCode::INTERNAL_ERROR,
            BleRadioError::Central(e) => match e {
                btleplug::Error::PermissionDenied => ErrorCode::PERMISSION_DENIED,
                btleplug::Error::DeviceNotFound => ErrorCode::PEER_NOT_FOUND,
                btleplug::Error::NotSupported(_) => ErrorCode::FEATURE_UNSUPPORTED,
                _ => ErrorCode::INTERNAL_ERROR,
            },
            #[cfg(target_os = "linux")]
            BleRadioError::Bluez(e) => match e.kind {
                bluer::ErrorKind::AlreadyExists => ErrorCode::ALREADY_STARTED,
                bluer::ErrorKind::InvalidLength => ErrorCode::DATA_TOO_LARGE,
                bluer::ErrorKind::NotSupported => ErrorCode::FEATURE_UNSUPPORTED,
                bluer::ErrorKind::NotPermitted | bluer::ErrorKind::NotAuthorized => {
                    ErrorCode::PERMISSION_DENIED
                }
                _ => ErrorCode::INTERNAL_ERROR,
            },
        }
    }
}

impl From<BleRadioError> for PeerlinkError {
    fn from(err: BleRadioError) -> Self {
        match err {
            BleRadioError::AdapterNotAvailable => {
                PeerlinkError::radio_unavailable("BLE adapter not available")
            }
            BleRadioError::PeerNotFound { peer } => PeerlinkError::PeerNotFound { peer },
            other => PeerlinkError::AdapterCommandFailure {
                operation: "ble",
                code: other.code(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            BleRadioError::AdvertisingUnsupported.code(),
            ErrorCode::FEATURE_UNSUPPORTED
        );
        assert_eq!(
            BleRadioError::Central(btleplug::Error::DeviceNotFound).code(),
            ErrorCode::PEER_NOT_FOUND
        );
        assert_eq!(
            BleRadioError::Central(btleplug::Error::PermissionDenied).code(),
            ErrorCode::PERMISSION_DENIED
        );
    }

    #[test]
    fn test_conversion_into_core_error() {
        assert!(matches!(
            PeerlinkError::from(BleRadioError::AdapterNotAvailable),
            PeerlinkError::RadioUnavailable { .. }
        ));
        assert!(matches!(
            PeerlinkError::from(BleRadioError::PeerNotFound {
                peer: PeerAddress::from("AA:BB")
            }),
            PeerlinkError::PeerNotFound { .. }
        ));
        assert!(matches!(
            PeerlinkError::from(BleRadioError::ConnectionTimeout),
            PeerlinkError::AdapterCommandFailure { operation: "ble", .. }
        ));
    }
}
