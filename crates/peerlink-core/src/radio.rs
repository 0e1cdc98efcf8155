//! Radio adapter surface consumed by the core
//!
//! A [`RadioAdapter`] is a stateless command surface: every command returns
//! immediately and its outcome is reported later as a [`RadioEvent`] on the
//! channel the adapter was constructed with. The core never assumes that a
//! command has completed when the call returns.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::protocol::{AdvertisingParameters, ScanFilter, ScanMode};
use crate::types::{EnumerationStatus, ErrorCode, LinkState, PeerAddress, Rssi};

// ----------------------------------------------------------------------------
// Adapter Trait
// ----------------------------------------------------------------------------

/// Capability queries and fire-and-forget radio commands
pub trait RadioAdapter: Send + Sync {
    /// Whether the radio is present and powered on
    fn is_radio_enabled(&self) -> bool;

    /// Whether the radio can act as an advertiser (peripheral role)
    fn supports_advertising(&self) -> bool;

    /// Start advertising; the outcome is reported with the same `attempt`
    fn start_advertising(&self, attempt: u64, params: &AdvertisingParameters);

    fn stop_advertising(&self);

    fn start_scan(&self, filter: &ScanFilter, mode: ScanMode);

    fn stop_scan(&self);

    fn open_link(&self, peer: &PeerAddress);

    fn close_link(&self, peer: &PeerAddress);

    fn enumerate_services(&self, peer: &PeerAddress);
}

// ----------------------------------------------------------------------------
// Adapter Events
// ----------------------------------------------------------------------------

/// Out-of-band results delivered by a radio adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadioEvent {
    AdvertisingStarted {
        attempt: u64,
    },
    AdvertisingFailed {
        attempt: u64,
        code: ErrorCode,
    },
    ScanFailed {
        code: ErrorCode,
    },
    /// One advertisement observed from a peer matching the scan filter
    Sighting {
        peer: PeerAddress,
        rssi: Rssi,
        name: Option<String>,
    },
    LinkStateChanged {
        peer: PeerAddress,
        state: LinkState,
    },
    /// A link-open attempt failed before a link was established
    LinkFailed {
        peer: PeerAddress,
        code: ErrorCode,
    },
    ServicesEnumerated {
        peer: PeerAddress,
        status: EnumerationStatus,
    },
}

/// Sending half handed to adapters at construction
pub type RadioEventSender = mpsc::UnboundedSender<RadioEvent>;

/// Receiving half drained by [`PeerLinkNode::run`](crate::PeerLinkNode::run)
pub type RadioEventReceiver = mpsc::UnboundedReceiver<RadioEvent>;

/// Create the channel connecting an adapter to a node
pub fn radio_event_channel() -> (RadioEventSender, RadioEventReceiver) {
    mpsc::unbounded_channel()
}
