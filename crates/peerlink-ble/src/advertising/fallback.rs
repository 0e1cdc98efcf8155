//! Fallback advertising implementation for unsupported platforms

use peerlink_core::AdvertisingParameters;
use tracing::warn;

use crate::error::BleRadioError;

use super::BleAdvertiser;

// ----------------------------------------------------------------------------
// Fallback Implementation
// ----------------------------------------------------------------------------

/// Advertiser for platforms without a peripheral-role backend
///
/// Scanning and linking still work; this device just cannot be found by others.
#[derive(Debug, Default)]
pub struct FallbackAdvertiser;

impl FallbackAdvertiser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl BleAdvertiser for FallbackAdvertiser {
    async fn initialize(&mut self, _power_on: bool) -> Result<bool, BleRadioError> {
        // Power state is not observable here; an adapter was found, so assume on
        Ok(true)
    }

    fn supports_advertising(&self) -> bool {
        false
    }

    async fn start_advertising(&mut self, params: &AdvertisingParameters) -> Result<(), BleRadioError> {
        warn!(
            "BLE advertising not supported on this platform. Service {} will not be discoverable. \
            Use Linux with BlueZ to advertise.",
            params.service_uuid
        );
        Err(BleRadioError::AdvertisingUnsupported)
    }

    async fn stop_advertising(&mut self) -> Result<(), BleRadioError> {
        Ok(())
    }

    fn is_advertising(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerlink_core::ErrorCode;

    #[tokio::test]
    async fn test_fallback_reports_unsupported() {
        let mut advertiser = FallbackAdvertiser::new();
        assert!(advertiser.initialize(true).await.unwrap());
        assert!(!advertiser.supports_advertising());

        let err = advertiser
            .start_advertising(&AdvertisingParameters::handshake(None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::FEATURE_UNSUPPORTED);
        assert!(!advertiser.is_advertising());
    }
}
