//! Linux BLE advertising implementation using bluer (BlueZ)

use std::collections::BTreeSet;

use bluer::adv::{Advertisement, AdvertisementHandle, Feature, Type};
use bluer::gatt::local::{
    Application, ApplicationHandle, Characteristic, CharacteristicRead, ReqError, Service,
};
use futures::FutureExt;
use peerlink_core::{AdvertisingParameters, HANDSHAKE_CHARACTERISTIC_UUID};
use tracing::{debug, info};

use crate::error::BleRadioError;

use super::BleAdvertiser;

// ----------------------------------------------------------------------------
// Linux Implementation
// ----------------------------------------------------------------------------

pub struct LinuxAdvertiser {
    session: Option<bluer::Session>,
    adapter: Option<bluer::Adapter>,
    advertisement_handle: Option<AdvertisementHandle>,
    gatt_handle: Option<ApplicationHandle>,
}

impl LinuxAdvertiser {
    pub fn new() -> Self {
        Self {
            session: None,
            adapter: None,
            advertisement_handle: None,
            gatt_handle: None,
        }
    }

    fn adapter(&self) -> Result<&bluer::Adapter, BleRadioError> {
        self.adapter.as_ref().ok_or(BleRadioError::AdapterNotAvailable)
    }

    /// GATT application exposing the handshake service
    fn handshake_application(params: &AdvertisingParameters) -> Application {
        Application {
            services: vec![Service {
                uuid: params.service_uuid,
                primary: true,
                characteristics: vec![Characteristic {
                    uuid: HANDSHAKE_CHARACTERISTIC_UUID,
                    read: Some(CharacteristicRead {
                        read: true,
                        fun: Box::new(|_request| {
                            async { Ok::<_, ReqError>(Vec::new()) }.boxed()
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn advertisement(params: &AdvertisingParameters) -> Advertisement {
        let mut system_includes = BTreeSet::new();
        if params.include_device_name && params.local_name.is_none() {
            system_includes.insert(Feature::LocalName);
        }
        if params.scan_response.include_tx_power_level {
            system_includes.insert(Feature::TxPower);
        }

        Advertisement {
            advertisement_type: if params.connectable {
                Type::Peripheral
            } else {
                Type::Broadcast
            },
            service_uuids: [params.service_uuid].into_iter().collect(),
            local_name: params
                .local_name
                .clone()
                .filter(|_| params.include_device_name),
            discoverable: Some(true),
            system_includes,
            tx_power: Some(params.tx_power.dbm()),
            timeout: params.timeout,
            ..Default::default()
        }
    }
}

impl Default for LinuxAdvertiser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BleAdvertiser for LinuxAdvertiser {
    async fn initialize(&mut self, power_on: bool) -> Result<bool, BleRadioError> {
        if self.session.is_none() {
            let session = bluer::Session::new().await?;
            let adapter = session.default_adapter().await?;
            self.session = Some(session);
            self.adapter = Some(adapter);
        }

        let adapter = self.adapter()?;
        if power_on && !adapter.is_powered().await? {
            adapter.set_powered(true).await?;
            info!("Powered on adapter {}", adapter.name());
        }

        let powered = adapter.is_powered().await?;
        info!(
            "Linux BLE adapter {} initialized for advertising (powered: {})",
            adapter.name(),
            powered
        );
        Ok(powered)
    }

    fn supports_advertising(&self) -> bool {
        self.adapter.is_some()
    }

    async fn start_advertising(&mut self, params: &AdvertisingParameters) -> Result<(), BleRadioError> {
        if self.advertisement_handle.is_some() {
            self.stop_advertising().await?;
        }

        let adapter = self.adapter()?;

        let gatt_handle = adapter
            .serve_gatt_application(Self::handshake_application(params))
            .await?;
        debug!("Registered handshake GATT service {}", params.service_uuid);

        let advertisement_handle = adapter.advertise(Self::advertisement(params)).await?;

        self.gatt_handle = Some(gatt_handle);
        self.advertisement_handle = Some(advertisement_handle);
        info!("Started BLE advertising for service {}", params.service_uuid);
        Ok(())
    }

    async fn stop_advertising(&mut self) -> Result<(), BleRadioError> {
        // Dropping the handles unregisters the advertisement and the service
        if self.advertisement_handle.take().is_some() {
            info!("Stopped BLE advertising");
        }
        self.gatt_handle = None;
        Ok(())
    }

    fn is_advertising(&self) -> bool {
        self.advertisement_handle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerlink_core::SERVICE_UUID;

    #[test]
    fn test_handshake_advertisement_payload() {
        let adv = LinuxAdvertiser::advertisement(&AdvertisingParameters::handshake(None));
        assert_eq!(adv.advertisement_type, Type::Peripheral);
        assert!(adv.service_uuids.contains(&SERVICE_UUID));
        assert!(adv.system_includes.contains(&Feature::LocalName));
        assert!(adv.system_includes.contains(&Feature::TxPower));
        assert_eq!(adv.timeout, None);
        assert_eq!(adv.tx_power, Some(1));
    }

    #[test]
    fn test_explicit_name_replaces_system_name() {
        let adv = LinuxAdvertiser::advertisement(&AdvertisingParameters::handshake(Some(
            "node-1".into(),
        )));
        assert_eq!(adv.local_name.as_deref(), Some("node-1"));
        assert!(!adv.system_includes.contains(&Feature::LocalName));
    }
}
