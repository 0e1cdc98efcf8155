//! PeerLink node application
//!
//! Wires a radio, the console sink and the core node together, runs the
//! requested sessions until the duration elapses or Ctrl-C, then tears
//! everything down and returns the final device list once link teardown has
//! been confirmed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use peerlink_ble::BtleplugRadio;
use peerlink_core::{
    radio_event_channel, AllowAll, EventSink, PeerLinkNode, PermissionGate, RadioAdapter,
    RadioEventReceiver,
};

use crate::cli::Mode;
use crate::config::AppConfig;
use crate::display::{ConsoleSink, DeviceRow};
use crate::error::Result;

pub struct PeerlinkApp {
    node: PeerLinkNode,
    events: RadioEventReceiver,
}

impl PeerlinkApp {
    /// Open the BLE adapter and build a node printing to the console
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let (events_tx, events_rx) = radio_event_channel();
        let radio = BtleplugRadio::connect(config.ble.clone(), events_tx).await?;
        Self::with_parts(
            config,
            Arc::new(radio),
            events_rx,
            Arc::new(ConsoleSink::new()),
            Arc::new(AllowAll),
        )
    }

    /// Build an app from explicit collaborators
    pub fn with_parts(
        config: &AppConfig,
        radio: Arc<dyn RadioAdapter>,
        events: RadioEventReceiver,
        sink: Arc<dyn EventSink>,
        gate: Arc<dyn PermissionGate>,
    ) -> Result<Self> {
        let node = PeerLinkNode::new(radio, sink, gate, &config.node)?;
        Ok(Self { node, events })
    }

    /// Run the sessions for `mode` until `duration` elapses or Ctrl-C
    pub async fn run(self, mode: Mode, duration: Option<Duration>) -> Result<Vec<DeviceRow>> {
        let stop = async move {
            match duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        self.run_until(mode, stop).await
    }

    /// Run the sessions for `mode` until `stop` resolves
    pub async fn run_until<F>(self, mode: Mode, stop: F) -> Result<Vec<DeviceRow>>
    where
        F: Future<Output = ()>,
    {
        let Self { node, mut events } = self;

        let grant = node.acquire_grant()?;
        if mode.advertises() {
            node.advertising().start(&grant).await?;
        }
        if mode.scans() {
            node.discovery().start(&grant).await?;
        }
        info!("PeerLink node running ({:?})", mode);

        node.run(&mut events, stop).await;
        node.shutdown(&mut events).await;

        let peers = node.registry().peers().await;
        Ok(peers.iter().map(DeviceRow::from).collect())
    }
}
