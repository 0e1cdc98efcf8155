//! Peer records and the per-peer connection state machine
//!
//! The state machine is a pure function: [`ConnectionState::transition`]
//! consumes the current state and an input, and returns the next state plus
//! the effects the registry has to carry out. Pairs without an edge are
//! rejected, which is how duplicate and late adapter callbacks are detected.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use tokio::time::Instant;

use crate::errors::StateTransitionError;
use crate::types::{EnumerationStatus, ErrorCode, PeerAddress, Rssi};

// ----------------------------------------------------------------------------
// Connection State
// ----------------------------------------------------------------------------

/// Connection state of a peer
///
/// `Discovered → Connecting → Connected → ServicesReady`, with `Disconnected`
/// reachable from every other state. A fresh sighting moves a disconnected
/// peer back to `Discovered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Discovered,
    /// A link-open attempt is in flight
    Connecting,
    Connected,
    ServicesReady,
    Disconnected,
}

impl ConnectionState {
    pub fn state_name(&self) -> &'static str {
        match self {
            ConnectionState::Discovered => "Discovered",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::ServicesReady => "ServicesReady",
            ConnectionState::Disconnected => "Disconnected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Disconnected)
    }

    /// Whether a link is established or being opened
    pub fn has_link(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::ServicesReady
        )
    }

    /// Process an input and compute the next state (consumes self)
    pub fn transition(self, input: PeerInput) -> Result<Transition, StateTransitionError> {
        use ConnectionState::*;

        let (new_state, effects): (ConnectionState, SmallVec<[Effect; 2]>) = match (self, input) {
            // Re-sightings refresh in place; a disconnected peer starts over
            (Disconnected, PeerInput::Sighted) => (Discovered, smallvec![Effect::NotifyDiscovered]),
            (state, PeerInput::Sighted) => (state, smallvec![Effect::NotifyDiscovered]),

            (Discovered, PeerInput::BeginConnect) => (Connecting, smallvec![Effect::OpenLink]),

            (Connecting, PeerInput::LinkOpened) => (
                Connected,
                smallvec![Effect::NotifyConnected, Effect::EnumerateServices],
            ),

            (Connecting, PeerInput::LinkFailed(code)) => {
                (Discovered, smallvec![Effect::NotifyLinkFailed(code)])
            }

            (Discovered | Connecting | Connected | ServicesReady, PeerInput::LinkClosed) => {
                (Disconnected, smallvec![Effect::NotifyDisconnected])
            }

            (Connected, PeerInput::ServicesEnumerated(EnumerationStatus::Success)) => {
                (ServicesReady, smallvec![Effect::NotifyServicesReady])
            }
            (Connected, PeerInput::ServicesEnumerated(EnumerationStatus::Failure(code))) => {
                (Connected, smallvec![Effect::NotifyServicesFailed(code)])
            }

            (state, input) => {
                return Err(StateTransitionError::InvalidTransition {
                    from_state: state.state_name(),
                    event: input.to_string(),
                });
            }
        };

        Ok(Transition { new_state, effects })
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state_name())
    }
}

// ----------------------------------------------------------------------------
// Inputs and Effects
// ----------------------------------------------------------------------------

/// Inputs driving a peer's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerInput {
    Sighted,
    /// Connect policy decided to open a link
    BeginConnect,
    LinkOpened,
    LinkClosed,
    LinkFailed(ErrorCode),
    ServicesEnumerated(EnumerationStatus),
}

impl fmt::Display for PeerInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerInput::Sighted => f.write_str("Sighted"),
            PeerInput::BeginConnect => f.write_str("BeginConnect"),
            PeerInput::LinkOpened => f.write_str("LinkOpened"),
            PeerInput::LinkClosed => f.write_str("LinkClosed"),
            PeerInput::LinkFailed(code) => write!(f, "LinkFailed({})", code.0),
            PeerInput::ServicesEnumerated(EnumerationStatus::Success) => {
                f.write_str("ServicesEnumerated(Success)")
            }
            PeerInput::ServicesEnumerated(EnumerationStatus::Failure(code)) => {
                write!(f, "ServicesEnumerated(Failure({}))", code.0)
            }
        }
    }
}

/// Work the registry performs after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    NotifyDiscovered,
    OpenLink,
    NotifyConnected,
    EnumerateServices,
    NotifyLinkFailed(ErrorCode),
    NotifyServicesReady,
    NotifyServicesFailed(ErrorCode),
    NotifyDisconnected,
}

/// Result of a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub new_state: ConnectionState,
    pub effects: SmallVec<[Effect; 2]>,
}

// ----------------------------------------------------------------------------
// Peer Record
// ----------------------------------------------------------------------------

/// Everything known about one peer
#[derive(Debug, Clone)]
pub struct Peer {
    address: PeerAddress,
    /// Last observed signal strength
    pub rssi: Rssi,
    pub name: Option<String>,
    pub state: ConnectionState,
    pub first_seen: Instant,
    pub last_seen: Instant,
    /// Link-open commands issued since the peer was (re)discovered
    pub link_attempts: u32,
}

impl Peer {
    /// Create a freshly discovered peer
    pub fn new(address: PeerAddress, rssi: Rssi, name: Option<String>) -> Self {
        let now = Instant::now();
        Self {
            address,
            rssi,
            name,
            state: ConnectionState::Discovered,
            first_seen: now,
            last_seen: now,
            link_attempts: 0,
        }
    }

    pub fn address(&self) -> &PeerAddress {
        &self.address
    }

    /// Record a re-sighting; a disconnected peer loses its history
    pub fn record_sighting(&mut self, rssi: Rssi, name: Option<String>) {
        let now = Instant::now();
        if self.state.is_terminal() {
            self.first_seen = now;
            self.link_attempts = 0;
            self.name = None;
        }
        self.rssi = rssi;
        if name.is_some() {
            self.name = name;
        }
        self.last_seen = now;
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::ServicesReady
        )
    }
}
