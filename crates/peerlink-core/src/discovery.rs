//! Scan lifecycle
//!
//! One scan session at a time, always filtered on the handshake service.
//! Sightings are handed to the [`PeerConnectionRegistry`], which decides
//! whether to open a link.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::authorization::RadioGrant;
use crate::errors::{PeerlinkError, Result};
use crate::protocol::{ScanFilter, ScanMode};
use crate::radio::RadioAdapter;
use crate::registry::PeerConnectionRegistry;
use crate::sink::EventSink;
use crate::types::{ErrorCode, PeerAddress, Rssi};

/// State of the single scan session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSession {
    pub active: bool,
    pub filter: ScanFilter,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self {
            active: false,
            filter: ScanFilter::HANDSHAKE,
        }
    }
}

/// Owns the "scanning" lifecycle
pub struct DiscoveryController {
    radio: Arc<dyn RadioAdapter>,
    sink: Arc<dyn EventSink>,
    registry: Arc<PeerConnectionRegistry>,
    stale_peer_timeout: Duration,
    session: Mutex<ScanSession>,
}

impl DiscoveryController {
    pub fn new(
        radio: Arc<dyn RadioAdapter>,
        sink: Arc<dyn EventSink>,
        registry: Arc<PeerConnectionRegistry>,
        stale_peer_timeout: Duration,
    ) -> Self {
        Self {
            radio,
            sink,
            registry,
            stale_peer_timeout,
            session: Mutex::new(ScanSession::default()),
        }
    }

    /// Start scanning; a no-op while a session is already active
    pub async fn start(&self, _grant: &RadioGrant) -> Result<()> {
        if !self.radio.is_radio_enabled() {
            return Err(PeerlinkError::radio_unavailable(
                "radio is powered off or absent",
            ));
        }

        let mut session = self.session.lock().await;
        if session.active {
            debug!("Already scanning");
            return Ok(());
        }

        self.radio.start_scan(&session.filter, ScanMode::LowLatency);
        session.active = true;
        info!("Started scanning for service {}", session.filter.service_uuid);
        Ok(())
    }

    /// Stop scanning and evict stale peers; a no-op when inactive
    pub async fn stop(&self) {
        {
            let mut session = self.session.lock().await;
            if !session.active {
                return;
            }
            self.radio.stop_scan();
            session.active = false;
        }
        info!("Stopped scanning");

        let evicted = self.registry.evict_stale(self.stale_peer_timeout).await;
        debug!("Scan stop evicted {} peers", evicted.len());
    }

    /// Forward one sighting to the registry
    pub async fn on_sighting(&self, peer: PeerAddress, rssi: Rssi, name: Option<String>) {
        if !self.is_active().await {
            debug!("Sighting of {} arrived after scanning stopped", peer);
        }
        self.registry.on_sighting(peer, rssi, name).await;
    }

    /// Surface a scan failure; the session flag is left as it is
    pub async fn on_scan_failed(&self, code: ErrorCode) {
        let active = self.is_active().await;
        if !active {
            debug!("Ignoring scan failure {} for an inactive session", code);
            return;
        }
        warn!("Scan failed: {}", code);
        self.sink.on_scan_failed(code);
    }

    pub async fn is_active(&self) -> bool {
        self.session.lock().await.active
    }

    pub async fn session(&self) -> ScanSession {
        self.session.lock().await.clone()
    }

    pub fn registry(&self) -> &Arc<PeerConnectionRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::AllowAll;
    use crate::peer::ConnectionState;
    use crate::sink::{ChannelSink, PeerEvent};
    use crate::testing::{MockRadio, RadioCommand};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn controller(radio: &Arc<MockRadio>) -> (DiscoveryController, UnboundedReceiver<PeerEvent>) {
        let (sink, events) = ChannelSink::new();
        let sink: Arc<dyn EventSink> = Arc::new(sink);
        let registry = Arc::new(PeerConnectionRegistry::new(
            radio.clone(),
            sink.clone(),
            Arc::new(AllowAll),
        ));
        let controller =
            DiscoveryController::new(radio.clone(), sink, registry, Duration::from_secs(30));
        (controller, events)
    }

    #[tokio::test]
    async fn test_start_issues_filtered_low_latency_scan_once() {
        let radio = Arc::new(MockRadio::new());
        let (controller, _events) = controller(&radio);
        let grant = RadioGrant::acquire(&AllowAll, radio.as_ref()).unwrap();

        controller.start(&grant).await.unwrap();
        controller.start(&grant).await.unwrap();

        assert_eq!(
            radio.commands(),
            vec![RadioCommand::StartScan(
                ScanFilter::HANDSHAKE,
                ScanMode::LowLatency
            )]
        );
    }

    #[tokio::test]
    async fn test_start_with_radio_disabled() {
        let radio = Arc::new(MockRadio::new());
        let (controller, _events) = controller(&radio);
        let grant = RadioGrant::acquire(&AllowAll, radio.as_ref()).unwrap();
        radio.set_enabled(false);

        let result = controller.start(&grant).await;
        assert!(matches!(result, Err(PeerlinkError::RadioUnavailable { .. })));
        assert!(radio.commands().is_empty());
        assert!(!controller.is_active().await);
    }

    #[tokio::test]
    async fn test_stop_when_inactive_is_noop() {
        let radio = Arc::new(MockRadio::new());
        let (controller, _events) = controller(&radio);

        controller.stop().await;
        assert!(radio.commands().is_empty());
    }

    #[tokio::test]
    async fn test_scan_failure_keeps_session_active() {
        let radio = Arc::new(MockRadio::new());
        let (controller, mut events) = controller(&radio);
        let grant = RadioGrant::acquire(&AllowAll, radio.as_ref()).unwrap();

        controller.start(&grant).await.unwrap();
        controller.on_scan_failed(ErrorCode::INTERNAL_ERROR).await;

        assert!(controller.is_active().await);
        assert_eq!(
            events.try_recv().unwrap(),
            PeerEvent::ScanFailed {
                code: ErrorCode::INTERNAL_ERROR
            }
        );
    }

    #[tokio::test]
    async fn test_late_sighting_still_reaches_registry() {
        let radio = Arc::new(MockRadio::new());
        let (controller, _events) = controller(&radio);

        controller
            .on_sighting(PeerAddress::from("AA:BB"), -60, None)
            .await;
        let peer = controller
            .registry()
            .peer(&PeerAddress::from("AA:BB"))
            .await
            .unwrap();
        assert_eq!(peer.state, ConnectionState::Connecting);
    }
}
