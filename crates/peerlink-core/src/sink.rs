//! Lifecycle event observers
//!
//! The presentation layer implements [`EventSink`] and is handed to the core at
//! construction. [`ChannelSink`] adapts the observer contract to a message
//! channel, and [`TracingSink`] simply logs.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::types::{ErrorCode, PeerAddress, Rssi};

// ----------------------------------------------------------------------------
// Observer Contract
// ----------------------------------------------------------------------------

/// Receives lifecycle notifications from the controllers and the registry
///
/// Notifications for one peer are delivered in transition order. Implementations
/// must not block.
pub trait EventSink: Send + Sync {
    /// A peer was sighted; repeated for every refresh
    fn on_peer_discovered(&self, peer: &PeerAddress, rssi: Rssi);

    fn on_peer_connected(&self, peer: &PeerAddress);

    fn on_peer_disconnected(&self, peer: &PeerAddress);

    fn on_advertising_failed(&self, code: ErrorCode);

    fn on_scan_failed(&self, code: ErrorCode);

    /// A link-open attempt failed and the peer went back to discovered
    fn on_link_failed(&self, _peer: &PeerAddress, _code: ErrorCode) {}

    fn on_services_ready(&self, _peer: &PeerAddress) {}

    fn on_services_failed(&self, _peer: &PeerAddress, _code: ErrorCode) {}
}

// ----------------------------------------------------------------------------
// Channel Adapter
// ----------------------------------------------------------------------------

/// Lifecycle notification as a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerEvent {
    Discovered { peer: PeerAddress, rssi: Rssi },
    Connected { peer: PeerAddress },
    Disconnected { peer: PeerAddress },
    LinkFailed { peer: PeerAddress, code: ErrorCode },
    ServicesReady { peer: PeerAddress },
    ServicesFailed { peer: PeerAddress, code: ErrorCode },
    AdvertisingFailed { code: ErrorCode },
    ScanFailed { code: ErrorCode },
}

/// Forwards every notification as a [`PeerEvent`] over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PeerEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PeerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: PeerEvent) {
        if self.tx.send(event).is_err() {
            debug!("Peer event receiver dropped, discarding event");
        }
    }
}

impl EventSink for ChannelSink {
    fn on_peer_discovered(&self, peer: &PeerAddress, rssi: Rssi) {
        self.send(PeerEvent::Discovered {
            peer: peer.clone(),
            rssi,
        });
    }

    fn on_peer_connected(&self, peer: &PeerAddress) {
        self.send(PeerEvent::Connected { peer: peer.clone() });
    }

    fn on_peer_disconnected(&self, peer: &PeerAddress) {
        self.send(PeerEvent::Disconnected { peer: peer.clone() });
    }

    fn on_advertising_failed(&self, code: ErrorCode) {
        self.send(PeerEvent::AdvertisingFailed { code });
    }

    fn on_scan_failed(&self, code: ErrorCode) {
        self.send(PeerEvent::ScanFailed { code });
    }

    fn on_link_failed(&self, peer: &PeerAddress, code: ErrorCode) {
        self.send(PeerEvent::LinkFailed {
            peer: peer.clone(),
            code,
        });
    }

    fn on_services_ready(&self, peer: &PeerAddress) {
        self.send(PeerEvent::ServicesReady { peer: peer.clone() });
    }

    fn on_services_failed(&self, peer: &PeerAddress, code: ErrorCode) {
        self.send(PeerEvent::ServicesFailed {
            peer: peer.clone(),
            code,
        });
    }
}

// ----------------------------------------------------------------------------
// Logging Sink
// ----------------------------------------------------------------------------

/// Logs every notification through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_peer_discovered(&self, peer: &PeerAddress, rssi: Rssi) {
        debug!("Peer {} sighted (RSSI: {})", peer, rssi);
    }

    fn on_peer_connected(&self, peer: &PeerAddress) {
        info!("Peer {} connected", peer);
    }

    fn on_peer_disconnected(&self, peer: &PeerAddress) {
        info!("Peer {} disconnected", peer);
    }

    fn on_advertising_failed(&self, code: ErrorCode) {
        warn!("Advertising failed: {}", code);
    }

    fn on_scan_failed(&self, code: ErrorCode) {
        warn!("Scan failed: {}", code);
    }

    fn on_link_failed(&self, peer: &PeerAddress, code: ErrorCode) {
        warn!("Link to peer {} failed: {}", peer, code);
    }

    fn on_services_ready(&self, peer: &PeerAddress) {
        info!("Peer {} services ready", peer);
    }

    fn on_services_failed(&self, peer: &PeerAddress, code: ErrorCode) {
        warn!("Service enumeration for peer {} failed: {}", peer, code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_forwards_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        let peer = PeerAddress::from("AA:BB");

        sink.on_peer_discovered(&peer, -60);
        sink.on_peer_connected(&peer);
        sink.on_scan_failed(ErrorCode::INTERNAL_ERROR);

        assert_eq!(
            rx.try_recv().unwrap(),
            PeerEvent::Discovered {
                peer: peer.clone(),
                rssi: -60
            }
        );
        assert_eq!(rx.try_recv().unwrap(), PeerEvent::Connected { peer });
        assert_eq!(
            rx.try_recv().unwrap(),
            PeerEvent::ScanFailed {
                code: ErrorCode::INTERNAL_ERROR
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.on_peer_disconnected(&PeerAddress::from("AA:BB"));
    }
}
