//! Central event pump
//!
//! Turns btleplug's adapter event stream into [`RadioEvent`]s. Sightings are
//! only reported while a scan is active and the advertised services match the
//! scan filter; hosts do not all honor the filter passed to `start_scan`.

use std::sync::Arc;

use btleplug::api::{Central, CentralEvent, Peripheral as _};
use btleplug::platform::{Adapter, PeripheralId};
use futures::stream::StreamExt;
use peerlink_core::{LinkState, PeerAddress, RadioEvent, RadioEventSender, ScanFilter};
use tokio::sync::RwLock;
use tracing::{debug, info, trace};

use crate::error::BleRadioError;

/// Filter of the scan in progress; `None` while not scanning
pub(crate) type ActiveScan = Arc<RwLock<Option<ScanFilter>>>;

// ----------------------------------------------------------------------------
// Event Pump
// ----------------------------------------------------------------------------

/// Forward adapter events until the stream ends or the node stops listening
pub(crate) async fn run_event_pump(
    adapter: Adapter,
    active_scan: ActiveScan,
    events: RadioEventSender,
) -> Result<(), BleRadioError> {
    let mut stream = adapter
        .events()
        .await
        .map_err(|e| BleRadioError::EventStreamFailed(e.to_string()))?;
    info!("BLE central event pump started");

    while let Some(event) = stream.next().await {
        let radio_event = match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                sighting(&adapter, &active_scan, &id).await
            }
            CentralEvent::DeviceDisconnected(id) => {
                peer_address(&adapter, &id)
                    .await
                    .map(|peer| RadioEvent::LinkStateChanged {
                        peer,
                        state: LinkState::Unlinked,
                    })
            }
            _ => None,
        };

        if let Some(radio_event) = radio_event {
            if events.send(radio_event).is_err() {
                debug!("Radio event receiver dropped, stopping event pump");
                break;
            }
        }
    }

    info!("BLE central event pump stopped");
    Ok(())
}

/// Build a sighting for a peripheral matching the active scan
async fn sighting(adapter: &Adapter, active_scan: &ActiveScan, id: &PeripheralId) -> Option<RadioEvent> {
    let filter = active_scan.read().await.clone()?;

    let peripheral = adapter.peripheral(id).await.ok()?;
    let properties = peripheral.properties().await.ok()??;

    if !filter.matches(&properties.services) {
        trace!("Skipping {} without the handshake service", properties.address);
        return None;
    }

    let Some(rssi) = properties.rssi else {
        trace!("Skipping {} without signal strength", properties.address);
        return None;
    };

    Some(RadioEvent::Sighting {
        peer: PeerAddress::new(properties.address.to_string()),
        rssi,
        name: properties.local_name,
    })
}

async fn peer_address(adapter: &Adapter, id: &PeripheralId) -> Option<PeerAddress> {
    let peripheral = adapter.peripheral(id).await.ok()?;
    Some(PeerAddress::new(peripheral.address().to_string()))
}
