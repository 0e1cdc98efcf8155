//! Bluetooth Low Energy radio adapter for PeerLink
//!
//! This crate provides [`BtleplugRadio`], an implementation of the core
//! `RadioAdapter` trait on top of the host's BLE stack.
//!
//! ## Architecture
//!
//! - [`config`] - adapter selection and connection settings
//! - [`error`] - error types specific to the BLE adapter
//! - `advertising` - peripheral-role backends (BlueZ on Linux, fallback elsewhere)
//! - `discovery` - the central event pump producing sightings and disconnects
//! - `connection` - link open/close and service enumeration tasks
//! - `radio` - the adapter itself
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use peerlink_ble::{BleRadioConfig, BtleplugRadio};
//! use peerlink_core::{radio_event_channel, AllowAll, PeerLinkNode, PeerlinkConfig, TracingSink};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (events_tx, mut events_rx) = radio_event_channel();
//! let radio = BtleplugRadio::connect(BleRadioConfig::default(), events_tx).await?;
//!
//! let node = PeerLinkNode::new(
//!     Arc::new(radio),
//!     Arc::new(TracingSink),
//!     Arc::new(AllowAll),
//!     &PeerlinkConfig::default(),
//! )?;
//! let grant = node.acquire_grant()?;
//! node.advertising().start(&grant).await?;
//! node.discovery().start(&grant).await?;
//! node.run(&mut events_rx, async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await;
//! node.shutdown(&mut events_rx).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Support
//!
//! ### Advertising Support
//! - **Linux**: Full support via `bluer` crate with BlueZ and GATT service registration
//! - **Other platforms**: Scanning and linking only
//!
//! ### Peer addresses
//! Peers are keyed by the Bluetooth device address btleplug reports. CoreBluetooth
//! hides real addresses, so on macOS every peer reports the same zeroed address
//! and only one peer can be tracked at a time.

mod advertising;
pub mod config;
mod connection;
mod discovery;
pub mod error;
mod radio;

// Public API exports
pub use advertising::{BleAdvertiser, PlatformAdvertiser};
pub use config::BleRadioConfig;
pub use error::BleRadioError;
pub use radio::BtleplugRadio;
