//! Peer discovery and connection core for PeerLink
//!
//! A device running PeerLink announces a fixed service over a short-range radio
//! and, at the same time, scans for other devices announcing it. Every peer
//! that is sighted gets a link opened to it, and its services are enumerated
//! once the link is up.
//!
//! ## Architecture
//!
//! - [`radio`] - the [`RadioAdapter`] command surface and the [`RadioEvent`]s it reports
//! - [`advertising`] - the advertising session
//! - [`discovery`] - the scan session
//! - [`registry`] - peer tracking and the connect-on-sighting policy
//! - [`peer`] - the per-peer connection state machine
//! - [`sink`] - the [`EventSink`] observer contract
//! - [`authorization`] - runtime permissions and the [`RadioGrant`] token
//! - [`node`] - wiring and the event loop
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use peerlink_core::{
//!     AllowAll, PeerLinkNode, PeerlinkConfig, RadioAdapter, RadioEventReceiver, TracingSink,
//! };
//!
//! // `radio` reports its results on the channel `events` drains
//! async fn run_node(
//!     radio: Arc<dyn RadioAdapter>,
//!     mut events: RadioEventReceiver,
//! ) -> peerlink_core::Result<()> {
//!     let node = PeerLinkNode::new(radio, Arc::new(TracingSink), Arc::new(AllowAll), &PeerlinkConfig::default())?;
//!
//!     let grant = node.acquire_grant()?;
//!     node.advertising().start(&grant).await?;
//!     node.discovery().start(&grant).await?;
//!
//!     node.run(&mut events, tokio::time::sleep(Duration::from_secs(60))).await;
//!     node.shutdown(&mut events).await;
//!     Ok(())
//! }
//! ```
//!
//! The `testing` feature adds an in-memory radio for tests.

pub mod advertising;
pub mod authorization;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod node;
pub mod peer;
pub mod protocol;
pub mod radio;
pub mod registry;
pub mod sink;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use advertising::{AdvertisingController, AdvertisingSession};
pub use authorization::{AllowAll, Permission, PermissionGate, RadioGrant};
pub use config::PeerlinkConfig;
pub use discovery::{DiscoveryController, ScanSession};
pub use errors::{PeerlinkError, Result, StateTransitionError};
pub use node::{PeerLinkNode, LINK_TEARDOWN_TIMEOUT};
pub use peer::{ConnectionState, Peer};
pub use protocol::{
    AdvertisingParameters, ScanFilter, ScanMode, ScanResponse, TxPowerLevel,
    HANDSHAKE_CHARACTERISTIC_UUID, SERVICE_UUID,
};
pub use radio::{radio_event_channel, RadioAdapter, RadioEvent, RadioEventReceiver, RadioEventSender};
pub use registry::PeerConnectionRegistry;
pub use sink::{ChannelSink, EventSink, PeerEvent, TracingSink};
pub use types::{EnumerationStatus, ErrorCode, LinkState, PeerAddress, Rssi};
