//! Node wiring and the radio event loop
//!
//! [`PeerLinkNode`] owns both controllers and the registry, and routes every
//! [`RadioEvent`] to the component it concerns. Events are handled one at a
//! time from a single loop, so a peer's callbacks are applied in the order the
//! adapter produced them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::advertising::AdvertisingController;
use crate::authorization::{PermissionGate, RadioGrant};
use crate::config::PeerlinkConfig;
use crate::discovery::DiscoveryController;
use crate::errors::Result;
use crate::protocol::AdvertisingParameters;
use crate::radio::{RadioAdapter, RadioEvent, RadioEventReceiver};
use crate::registry::PeerConnectionRegistry;
use crate::sink::EventSink;
use crate::types::LinkState;

/// How long [`PeerLinkNode::shutdown`] waits for closed links to be confirmed
pub const LINK_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(2);

pub struct PeerLinkNode {
    radio: Arc<dyn RadioAdapter>,
    gate: Arc<dyn PermissionGate>,
    advertising: AdvertisingController,
    discovery: DiscoveryController,
    registry: Arc<PeerConnectionRegistry>,
}

impl PeerLinkNode {
    /// Wire up a node; fails if the configuration is invalid
    pub fn new(
        radio: Arc<dyn RadioAdapter>,
        sink: Arc<dyn EventSink>,
        gate: Arc<dyn PermissionGate>,
        config: &PeerlinkConfig,
    ) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(PeerConnectionRegistry::new(
            radio.clone(),
            sink.clone(),
            gate.clone(),
        ));
        let advertising = AdvertisingController::new(
            radio.clone(),
            sink.clone(),
            AdvertisingParameters::handshake(config.device_name.clone()),
        );
        let discovery = DiscoveryController::new(
            radio.clone(),
            sink,
            registry.clone(),
            config.stale_peer_timeout(),
        );

        Ok(Self {
            radio,
            gate,
            advertising,
            discovery,
            registry,
        })
    }

    /// Confirm authorization and radio power with this node's gate
    pub fn acquire_grant(&self) -> Result<RadioGrant> {
        RadioGrant::acquire(self.gate.as_ref(), self.radio.as_ref())
    }

    pub fn advertising(&self) -> &AdvertisingController {
        &self.advertising
    }

    pub fn discovery(&self) -> &DiscoveryController {
        &self.discovery
    }

    pub fn registry(&self) -> &Arc<PeerConnectionRegistry> {
        &self.registry
    }

    /// Route one adapter event
    pub async fn dispatch(&self, event: RadioEvent) {
        match event {
            RadioEvent::AdvertisingStarted { attempt } => {
                self.advertising.on_started(attempt).await
            }
            RadioEvent::AdvertisingFailed { attempt, code } => {
                self.advertising.on_failed(attempt, code).await
            }
            RadioEvent::ScanFailed { code } => self.discovery.on_scan_failed(code).await,
            RadioEvent::Sighting { peer, rssi, name } => {
                self.discovery.on_sighting(peer, rssi, name).await
            }
            RadioEvent::LinkStateChanged { peer, state } => {
                self.registry.on_link_state_change(&peer, state).await
            }
            RadioEvent::LinkFailed { peer, code } => {
                self.registry.on_link_failed(&peer, code).await
            }
            RadioEvent::ServicesEnumerated { peer, status } => {
                self.registry.on_services_enumerated(&peer, status).await
            }
        }
    }

    /// Drain adapter events until the channel closes or `shutdown` resolves
    pub async fn run<F>(&self, events: &mut RadioEventReceiver, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Peer link node event loop starting");

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            debug!("Radio event: {:?}", event);
                            self.dispatch(event).await;
                        }
                        None => {
                            info!("Radio event channel closed, stopping event loop");
                            break;
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping event loop");
                    break;
                }
            }
        }
    }

    /// Stop both sessions and close every link
    ///
    /// Link teardown completes asynchronously, so `events` keeps being applied
    /// until no peer holds a link, the channel closes, or
    /// [`LINK_TEARDOWN_TIMEOUT`] passes.
    pub async fn shutdown(&self, events: &mut RadioEventReceiver) {
        self.advertising.stop().await;
        self.discovery.stop().await;
        self.registry.disconnect_all().await;

        let teardown = self.drain_link_teardown(events);
        if tokio::time::timeout(LINK_TEARDOWN_TIMEOUT, teardown)
            .await
            .is_err()
        {
            warn!(
                "{} links still open after {:?}",
                self.registry.linked_count().await,
                LINK_TEARDOWN_TIMEOUT
            );
        }
        info!("Peer link node shut down");
    }

    async fn drain_link_teardown(&self, events: &mut RadioEventReceiver) {
        while self.registry.linked_count().await > 0 {
            let Some(event) = events.recv().await else {
                debug!("Radio event channel closed during link teardown");
                return;
            };

            // A link-open still in flight can complete after the close request
            let opened = match &event {
                RadioEvent::LinkStateChanged {
                    peer,
                    state: LinkState::Linked,
                } => Some(peer.clone()),
                _ => None,
            };
            self.dispatch(event).await;
            if let Some(peer) = opened {
                if let Err(e) = self.registry.disconnect(&peer).await {
                    debug!("Late link to {} not closed: {}", peer, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::AllowAll;
    use crate::peer::ConnectionState;
    use crate::radio::radio_event_channel;
    use crate::sink::ChannelSink;
    use crate::testing::{MockRadio, RadioCommand};
    use crate::types::PeerAddress;

    fn node(radio: &Arc<MockRadio>) -> PeerLinkNode {
        let (sink, _events) = ChannelSink::new();
        PeerLinkNode::new(
            radio.clone(),
            Arc::new(sink),
            Arc::new(AllowAll),
            &PeerlinkConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let radio = Arc::new(MockRadio::new());
        let (sink, _events) = ChannelSink::new();
        let config = PeerlinkConfig::new().with_device_name("far-too-long-name");
        assert!(PeerLinkNode::new(radio, Arc::new(sink), Arc::new(AllowAll), &config).is_err());
    }

    #[tokio::test]
    async fn test_run_processes_events_until_channel_closes() {
        let radio = Arc::new(MockRadio::new());
        let node = node(&radio);
        let (tx, mut rx) = radio_event_channel();
        let peer = PeerAddress::from("AA:BB");

        tx.send(RadioEvent::Sighting {
            peer: peer.clone(),
            rssi: -60,
            name: None,
        })
        .unwrap();
        tx.send(RadioEvent::LinkStateChanged {
            peer: peer.clone(),
            state: LinkState::Linked,
        })
        .unwrap();
        drop(tx);

        node.run(&mut rx, std::future::pending()).await;

        let snapshot = node.registry().peer(&peer).await.unwrap();
        assert_eq!(snapshot.state, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let radio = Arc::new(MockRadio::new());
        let node = node(&radio);
        let (_tx, mut rx) = radio_event_channel();

        node.run(&mut rx, async {}).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_sessions_and_closes_links() {
        let radio = Arc::new(MockRadio::new());
        let node = node(&radio);
        let (_tx, mut rx) = radio_event_channel();
        let grant = node.acquire_grant().unwrap();

        node.advertising().start(&grant).await.unwrap();
        node.discovery().start(&grant).await.unwrap();
        node.dispatch(RadioEvent::Sighting {
            peer: PeerAddress::from("AA:BB"),
            rssi: -60,
            name: None,
        })
        .await;
        radio.clear();

        // Nothing confirms the close, so shutdown gives up after the timeout
        let started = tokio::time::Instant::now();
        node.shutdown(&mut rx).await;
        assert!(started.elapsed() >= LINK_TEARDOWN_TIMEOUT);

        assert_eq!(
            radio.commands(),
            vec![
                RadioCommand::StopAdvertising,
                RadioCommand::StopScan,
                RadioCommand::CloseLink(PeerAddress::from("AA:BB")),
            ]
        );
    }

    #[tokio::test]
    async fn test_shutdown_applies_link_teardown() {
        let (tx, mut rx) = radio_event_channel();
        let radio = Arc::new(MockRadio::new().with_events(tx.clone()));
        let node = node(&radio);
        let peer = PeerAddress::from("AA:BB");

        tx.send(RadioEvent::Sighting {
            peer: peer.clone(),
            rssi: -60,
            name: None,
        })
        .unwrap();
        tx.send(RadioEvent::LinkStateChanged {
            peer: peer.clone(),
            state: LinkState::Linked,
        })
        .unwrap();
        while let Ok(event) = rx.try_recv() {
            node.dispatch(event).await;
        }
        assert_eq!(node.registry().linked_count().await, 1);

        node.shutdown(&mut rx).await;

        let snapshot = node.registry().peer(&peer).await.unwrap();
        assert_eq!(snapshot.state, ConnectionState::Disconnected);
        assert_eq!(node.registry().linked_count().await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_link_that_opens_late() {
        let (tx, mut rx) = radio_event_channel();
        let radio = Arc::new(MockRadio::new());
        let node = node(&radio);
        let peer = PeerAddress::from("AA:BB");

        node.dispatch(RadioEvent::Sighting {
            peer: peer.clone(),
            rssi: -60,
            name: None,
        })
        .await;
        // The open completes after the close request, then the close lands
        tx.send(RadioEvent::LinkStateChanged {
            peer: peer.clone(),
            state: LinkState::Linked,
        })
        .unwrap();
        tx.send(RadioEvent::LinkStateChanged {
            peer: peer.clone(),
            state: LinkState::Unlinked,
        })
        .unwrap();

        node.shutdown(&mut rx).await;

        assert_eq!(radio.count(|c| matches!(c, RadioCommand::CloseLink(_))), 2);
        let snapshot = node.registry().peer(&peer).await.unwrap();
        assert_eq!(snapshot.state, ConnectionState::Disconnected);
    }
}
