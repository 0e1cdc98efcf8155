//! Link management
//!
//! Each link command runs as its own task and reports its outcome on the
//! radio event channel. Nothing here tracks peer state; the registry does.

use std::time::Duration;

use btleplug::api::{Central, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral};
use peerlink_core::{
    EnumerationStatus, ErrorCode, LinkState, PeerAddress, RadioEvent, RadioEventSender, SERVICE_UUID,
};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::BleRadioError;

// ----------------------------------------------------------------------------
// Peripheral Lookup
// ----------------------------------------------------------------------------

/// Find the peripheral the adapter knows under `peer`
pub(crate) async fn find_peripheral(
    adapter: &Adapter,
    peer: &PeerAddress,
) -> Result<Peripheral, BleRadioError> {
    adapter
        .peripherals()
        .await?
        .into_iter()
        .find(|p| p.address().to_string() == peer.as_str())
        .ok_or_else(|| BleRadioError::PeerNotFound { peer: peer.clone() })
}

fn report(events: &RadioEventSender, event: RadioEvent) {
    if events.send(event).is_err() {
        debug!("Radio event receiver dropped, discarding link result");
    }
}

// ----------------------------------------------------------------------------
// Link Tasks
// ----------------------------------------------------------------------------

/// Open a link and report `Linked` or `LinkFailed`
pub(crate) async fn open_link(
    adapter: Adapter,
    peer: PeerAddress,
    connection_timeout: Duration,
    events: RadioEventSender,
) {
    let result = async {
        let peripheral = find_peripheral(&adapter, &peer).await?;
        if peripheral.is_connected().await? {
            return Ok(());
        }
        timeout(connection_timeout, peripheral.connect())
            .await
            .map_err(|_| BleRadioError::ConnectionTimeout)??;
        Ok::<_, BleRadioError>(())
    }
    .await;

    match result {
        Ok(()) => {
            info!("Connected to peer: {}", peer);
            report(
                &events,
                RadioEvent::LinkStateChanged {
                    peer,
                    state: LinkState::Linked,
                },
            );
        }
        Err(e) => {
            error!("Failed to connect to peer {}: {}", peer, e);
            report(
                &events,
                RadioEvent::LinkFailed {
                    peer,
                    code: e.code(),
                },
            );
        }
    }
}

/// Close a link and report `Unlinked`
///
/// The host may also report the disconnection through the event pump; the
/// registry absorbs the second report.
pub(crate) async fn close_link(adapter: Adapter, peer: PeerAddress, events: RadioEventSender) {
    let result = async {
        let peripheral = find_peripheral(&adapter, &peer).await?;
        peripheral.disconnect().await?;
        Ok::<_, BleRadioError>(())
    }
    .await;

    match result {
        Ok(()) => {
            info!("Disconnected from peer: {}", peer);
            report(
                &events,
                RadioEvent::LinkStateChanged {
                    peer,
                    state: LinkState::Unlinked,
                },
            );
        }
        Err(e) => warn!("Failed to disconnect from peer {}: {}", peer, e),
    }
}

/// Discover services and report whether the handshake service is present
pub(crate) async fn enumerate_services(adapter: Adapter, peer: PeerAddress, events: RadioEventSender) {
    let result = async {
        let peripheral = find_peripheral(&adapter, &peer).await?;
        peripheral.discover_services().await?;
        Ok::<_, BleRadioError>(peripheral.services())
    }
    .await;

    let status = match result {
        Ok(services) if services.iter().any(|s| s.uuid == SERVICE_UUID) => {
            debug!("Peer {} exposes {} services", peer, services.len());
            EnumerationStatus::Success
        }
        Ok(_) => {
            warn!("Peer {} does not expose the handshake service", peer);
            EnumerationStatus::Failure(ErrorCode::SERVICE_NOT_FOUND)
        }
        Err(e) => {
            error!("Failed to discover services for peer {}: {}", peer, e);
            EnumerationStatus::Failure(e.code())
        }
    };

    report(&events, RadioEvent::ServicesEnumerated { peer, status });
}
