//! Console output: live lifecycle lines and the final device list

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::debug;

use peerlink_core::{ConnectionState, ErrorCode, EventSink, Peer, PeerAddress, PeerEvent, Rssi};

// ----------------------------------------------------------------------------
// Console Sink
// ----------------------------------------------------------------------------

/// Prints lifecycle events to stdout
///
/// Every peer is announced once; later sightings only refresh its signal
/// strength and are logged at debug level.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    announced: Mutex<HashSet<PeerAddress>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn print(&self, event: PeerEvent) {
        println!("{}", describe(&event));
    }
}

impl EventSink for ConsoleSink {
    fn on_peer_discovered(&self, peer: &PeerAddress, rssi: Rssi) {
        let first = self
            .announced
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(peer.clone());

        if first {
            self.print(PeerEvent::Discovered {
                peer: peer.clone(),
                rssi,
            });
        } else {
            debug!("Peer {} refreshed (RSSI: {})", peer, rssi);
        }
    }

    fn on_peer_connected(&self, peer: &PeerAddress) {
        self.print(PeerEvent::Connected { peer: peer.clone() });
    }

    fn on_peer_disconnected(&self, peer: &PeerAddress) {
        self.announced
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(peer);
        self.print(PeerEvent::Disconnected { peer: peer.clone() });
    }

    fn on_advertising_failed(&self, code: ErrorCode) {
        self.print(PeerEvent::AdvertisingFailed { code });
    }

    fn on_scan_failed(&self, code: ErrorCode) {
        self.print(PeerEvent::ScanFailed { code });
    }

    fn on_link_failed(&self, peer: &PeerAddress, code: ErrorCode) {
        self.print(PeerEvent::LinkFailed {
            peer: peer.clone(),
            code,
        });
    }

    fn on_services_ready(&self, peer: &PeerAddress) {
        self.print(PeerEvent::ServicesReady { peer: peer.clone() });
    }

    fn on_services_failed(&self, peer: &PeerAddress, code: ErrorCode) {
        self.print(PeerEvent::ServicesFailed {
            peer: peer.clone(),
            code,
        });
    }
}

/// One console line per lifecycle event
pub fn describe(event: &PeerEvent) -> String {
    match event {
        PeerEvent::Discovered { peer, rssi } => format!("+ {} discovered ({} dBm)", peer, rssi),
        PeerEvent::Connected { peer } => format!("= {} connected", peer),
        PeerEvent::Disconnected { peer } => format!("- {} disconnected", peer),
        PeerEvent::LinkFailed { peer, code } => format!("! {} link failed: {}", peer, code),
        PeerEvent::ServicesReady { peer } => format!("* {} ready for handshake", peer),
        PeerEvent::ServicesFailed { peer, code } => {
            format!("! {} service discovery failed: {}", peer, code)
        }
        PeerEvent::AdvertisingFailed { code } => format!("! advertising failed: {}", code),
        PeerEvent::ScanFailed { code } => format!("! scan failed: {}", code),
    }
}

// ----------------------------------------------------------------------------
// Device List
// ----------------------------------------------------------------------------

/// Serializable view of a peer for the final listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRow {
    pub address: String,
    pub name: Option<String>,
    pub rssi: Rssi,
    pub state: ConnectionState,
    pub link_attempts: u32,
}

impl From<&Peer> for DeviceRow {
    fn from(peer: &Peer) -> Self {
        Self {
            address: peer.address().to_string(),
            name: peer.name.clone(),
            rssi: peer.rssi,
            state: peer.state,
            link_attempts: peer.link_attempts,
        }
    }
}

/// Render the device list as an aligned table
pub fn render_device_list(rows: &[DeviceRow]) -> String {
    if rows.is_empty() {
        return "No peers discovered\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Discovered peers:");
    let _ = writeln!(
        out,
        "  {:<20} {:<16} {:>6}  {}",
        "ADDRESS", "NAME", "RSSI", "STATE"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "  {:<20} {:<16} {:>6}  {}",
            row.address,
            row.name.as_deref().unwrap_or("-"),
            row.rssi,
            row.state
        );
    }
    out
}
