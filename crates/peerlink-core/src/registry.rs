//! Peer connection registry
//!
//! Owns every [`Peer`] from its first sighting until eviction and drives each
//! peer's state machine from sightings and adapter callbacks.
//!
//! Each peer lives behind its own mutex, so transitions for one peer are
//! strictly serialized while different peers proceed independently. The peer
//! table is only write-locked to insert or evict entries. Effects of a
//! transition (radio commands and sink notifications) run while the peer's
//! lock is held, so observers see one peer's notifications in transition order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::authorization::{Permission, PermissionGate};
use crate::errors::{PeerlinkError, Result};
use crate::peer::{ConnectionState, Effect, Peer, PeerInput};
use crate::radio::RadioAdapter;
use crate::sink::EventSink;
use crate::types::{EnumerationStatus, ErrorCode, LinkState, PeerAddress, Rssi};

// ----------------------------------------------------------------------------
// Peer Table
// ----------------------------------------------------------------------------

#[derive(Default)]
struct PeerTable {
    slots: HashMap<PeerAddress, Arc<Mutex<Peer>>>,
    /// Addresses in first-sighting order
    order: Vec<PeerAddress>,
}

// ----------------------------------------------------------------------------
// Registry
// ----------------------------------------------------------------------------

/// Tracks peers and drives their connection state machines
pub struct PeerConnectionRegistry {
    radio: Arc<dyn RadioAdapter>,
    sink: Arc<dyn EventSink>,
    gate: Arc<dyn PermissionGate>,
    peers: RwLock<PeerTable>,
}

impl PeerConnectionRegistry {
    pub fn new(
        radio: Arc<dyn RadioAdapter>,
        sink: Arc<dyn EventSink>,
        gate: Arc<dyn PermissionGate>,
    ) -> Self {
        Self {
            radio,
            sink,
            gate,
            peers: RwLock::new(PeerTable::default()),
        }
    }

    /// Record a sighting and apply the connect-on-sighting policy
    ///
    /// Unknown peers are created in `Discovered`. Known peers are refreshed
    /// and re-announced; a disconnected peer starts over in `Discovered`.
    /// While a peer is `Discovered`, each sighting opens a link if the connect
    /// permission is granted. `Connecting` marks the attempt as in flight, so
    /// at most one link-open is outstanding per peer.
    pub async fn on_sighting(&self, address: PeerAddress, rssi: Rssi, name: Option<String>) {
        let (mut peer, created) = self.lock_or_insert(&address, rssi, name.clone()).await;

        if created {
            info!("Discovered new peer: {} (RSSI: {})", address, rssi);
            self.sink.on_peer_discovered(peer.address(), rssi);
        } else {
            peer.record_sighting(rssi, name);
            self.apply(&mut peer, PeerInput::Sighted);
        }

        if peer.state != ConnectionState::Discovered {
            return;
        }

        if self.gate.is_granted(Permission::Connect) {
            self.apply(&mut peer, PeerInput::BeginConnect);
        } else {
            debug!(
                "Connect permission not granted, leaving peer {} discovered",
                address
            );
        }
    }

    /// Apply an adapter-reported link state change
    pub async fn on_link_state_change(&self, address: &PeerAddress, state: LinkState) {
        let input = match state {
            LinkState::Linked => PeerInput::LinkOpened,
            LinkState::Unlinked => PeerInput::LinkClosed,
        };
        self.drive(address, input).await;
    }

    /// Apply an adapter-reported link-open failure
    pub async fn on_link_failed(&self, address: &PeerAddress, code: ErrorCode) {
        self.drive(address, PeerInput::LinkFailed(code)).await;
    }

    /// Apply the result of a service enumeration
    pub async fn on_services_enumerated(&self, address: &PeerAddress, status: EnumerationStatus) {
        self.drive(address, PeerInput::ServicesEnumerated(status))
            .await;
    }

    /// Close the link to one peer
    ///
    /// The resulting state change arrives later as an `Unlinked` callback.
    pub async fn disconnect(&self, address: &PeerAddress) -> Result<()> {
        let slot = self
            .slot(address)
            .await
            .ok_or_else(|| PeerlinkError::PeerNotFound {
                peer: address.clone(),
            })?;

        let peer = slot.lock().await;
        if peer.state.has_link() {
            info!("Closing link to peer {}", address);
            self.radio.close_link(address);
        }
        Ok(())
    }

    /// Close every live or pending link
    pub async fn disconnect_all(&self) {
        for slot in self.slots_in_order().await {
            let peer = slot.lock().await;
            if peer.state.has_link() {
                self.radio.close_link(peer.address());
            }
        }
    }

    /// Remove unlinked peers not sighted within `max_age`
    ///
    /// Only `Discovered` and `Disconnected` peers are candidates; peers with a
    /// live or pending link, or currently being updated, are kept.
    pub async fn evict_stale(&self, max_age: Duration) -> Vec<PeerAddress> {
        let mut table = self.peers.write().await;

        let stale: Vec<PeerAddress> = table
            .slots
            .iter()
            .filter_map(|(address, slot)| {
                let peer = slot.try_lock().ok()?;
                let expired = !peer.state.has_link() && peer.last_seen.elapsed() > max_age;
                expired.then(|| address.clone())
            })
            .collect();

        for address in &stale {
            table.slots.remove(address);
            debug!("Evicted stale peer {}", address);
        }
        table.order.retain(|address| !stale.contains(address));

        if !stale.is_empty() {
            info!("Evicted {} stale peers", stale.len());
        }
        stale
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Snapshot of one peer
    pub async fn peer(&self, address: &PeerAddress) -> Option<Peer> {
        let slot = self.slot(address).await?;
        let peer = slot.lock().await;
        Some(peer.clone())
    }

    /// Snapshot of every peer in first-sighting order
    pub async fn peers(&self) -> Vec<Peer> {
        let mut snapshot = Vec::new();
        for slot in self.slots_in_order().await {
            snapshot.push(slot.lock().await.clone());
        }
        snapshot
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of peers with a live or pending link
    pub async fn linked_count(&self) -> usize {
        let mut count = 0;
        for slot in self.slots_in_order().await {
            if slot.lock().await.state.has_link() {
                count += 1;
            }
        }
        count
    }

    /// Number of peers currently in `state`
    pub async fn count_in(&self, state: ConnectionState) -> usize {
        let mut count = 0;
        for slot in self.slots_in_order().await {
            if slot.lock().await.state == state {
                count += 1;
            }
        }
        count
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    async fn slot(&self, address: &PeerAddress) -> Option<Arc<Mutex<Peer>>> {
        self.peers.read().await.slots.get(address).cloned()
    }

    async fn slots_in_order(&self) -> Vec<Arc<Mutex<Peer>>> {
        let table = self.peers.read().await;
        table
            .order
            .iter()
            .filter_map(|address| table.slots.get(address).cloned())
            .collect()
    }

    /// Whether `slot` is still the table entry for `address`
    ///
    /// A slot fetched before an eviction can be locked after it, so callers
    /// check this once they hold the peer's lock.
    async fn is_current(&self, address: &PeerAddress, slot: &Arc<Mutex<Peer>>) -> bool {
        self.peers
            .read()
            .await
            .slots
            .get(address)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Lock the peer currently registered under `address`
    async fn lock_current(&self, address: &PeerAddress) -> Option<OwnedMutexGuard<Peer>> {
        loop {
            let slot = self.slot(address).await?;
            let guard = Arc::clone(&slot).lock_owned().await;
            if self.is_current(address, &slot).await {
                return Some(guard);
            }
            debug!("Peer {} was evicted while waiting, retrying", address);
        }
    }

    /// Lock an existing peer, or create and lock a new one
    ///
    /// A new peer is locked before it becomes visible in the table, so no other
    /// task can act on it before its discovery has been announced.
    async fn lock_or_insert(
        &self,
        address: &PeerAddress,
        rssi: Rssi,
        name: Option<String>,
    ) -> (OwnedMutexGuard<Peer>, bool) {
        loop {
            if let Some(guard) = self.lock_current(address).await {
                return (guard, false);
            }

            let mut table = self.peers.write().await;
            if table.slots.contains_key(address) {
                continue;
            }

            let slot = Arc::new(Mutex::new(Peer::new(address.clone(), rssi, name)));
            let guard = Arc::clone(&slot).lock_owned().await;
            table.slots.insert(address.clone(), slot);
            table.order.push(address.clone());
            return (guard, true);
        }
    }

    async fn drive(&self, address: &PeerAddress, input: PeerInput) {
        match self.lock_current(address).await {
            Some(mut peer) => self.apply(&mut peer, input),
            None => debug!("Ignoring {} for unknown peer {}", input, address),
        }
    }

    /// Run one transition and its effects; rejected inputs are absorbed
    fn apply(&self, peer: &mut Peer, input: PeerInput) {
        match peer.state.transition(input) {
            Ok(transition) => {
                if transition.new_state != peer.state {
                    debug!(
                        "Peer {}: {} -> {} on {}",
                        peer.address(),
                        peer.state,
                        transition.new_state,
                        input
                    );
                }
                peer.state = transition.new_state;
                for effect in transition.effects {
                    self.execute(peer, effect);
                }
            }
            Err(e) => debug!("Absorbed duplicate event for peer {}: {}", peer.address(), e),
        }
    }

    fn execute(&self, peer: &mut Peer, effect: Effect) {
        let address = peer.address();
        match effect {
            Effect::NotifyDiscovered => self.sink.on_peer_discovered(address, peer.rssi),
            Effect::OpenLink => {
                info!("Opening link to peer {}", address);
                self.radio.open_link(address);
                peer.link_attempts += 1;
            }
            Effect::NotifyConnected => {
                info!("Connected to peer {}", address);
                self.sink.on_peer_connected(address);
            }
            Effect::EnumerateServices => self.radio.enumerate_services(address),
            Effect::NotifyLinkFailed(code) => {
                warn!("Link to peer {} failed: {}", address, code);
                self.sink.on_link_failed(address, code);
            }
            Effect::NotifyServicesReady => {
                info!("Services ready on peer {}", address);
                self.sink.on_services_ready(address);
            }
            Effect::NotifyServicesFailed(code) => {
                warn!("Service enumeration on peer {} failed: {}", address, code);
                self.sink.on_services_failed(address, code);
            }
            Effect::NotifyDisconnected => {
                info!("Disconnected from peer {}", address);
                self.sink.on_peer_disconnected(address);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{ChannelSink, PeerEvent};
    use crate::testing::{MockGate, MockRadio, RadioCommand};
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        radio: Arc<MockRadio>,
        gate: Arc<MockGate>,
        registry: PeerConnectionRegistry,
        events: UnboundedReceiver<PeerEvent>,
    }

    fn fixture() -> Fixture {
        let radio = Arc::new(MockRadio::new());
        let gate = Arc::new(MockGate::new());
        let (sink, events) = ChannelSink::new();
        let registry = PeerConnectionRegistry::new(radio.clone(), Arc::new(sink), gate.clone());
        Fixture {
            radio,
            gate,
            registry,
            events,
        }
    }

    fn addr(s: &str) -> PeerAddress {
        PeerAddress::from(s)
    }

    #[tokio::test]
    async fn test_first_sighting_creates_and_connects() {
        let mut f = fixture();
        f.registry.on_sighting(addr("AA:BB"), -60, None).await;

        let peer = f.registry.peer(&addr("AA:BB")).await.unwrap();
        assert_eq!(peer.state, ConnectionState::Connecting);
        assert_eq!(peer.link_attempts, 1);
        assert_eq!(
            f.events.try_recv().unwrap(),
            PeerEvent::Discovered {
                peer: addr("AA:BB"),
                rssi: -60
            }
        );
        assert_eq!(f.radio.commands(), vec![RadioCommand::OpenLink(addr("AA:BB"))]);
    }

    #[tokio::test]
    async fn test_resighting_refreshes_without_new_link() {
        let mut f = fixture();
        f.registry.on_sighting(addr("AA:BB"), -60, None).await;
        f.registry
            .on_sighting(addr("AA:BB"), -45, Some("phone".into()))
            .await;

        let peer = f.registry.peer(&addr("AA:BB")).await.unwrap();
        assert_eq!(peer.rssi, -45);
        assert_eq!(peer.name.as_deref(), Some("phone"));
        assert_eq!(f.radio.open_links_for(&addr("AA:BB")), 1);
        assert_eq!(f.registry.len().await, 1);

        f.events.try_recv().unwrap();
        assert_eq!(
            f.events.try_recv().unwrap(),
            PeerEvent::Discovered {
                peer: addr("AA:BB"),
                rssi: -45
            }
        );
    }

    #[tokio::test]
    async fn test_connect_permission_missing_keeps_discovered() {
        let f = fixture();
        f.gate.deny(Permission::Connect);

        f.registry.on_sighting(addr("AA:BB"), -60, None).await;
        f.registry.on_sighting(addr("AA:BB"), -61, None).await;
        assert_eq!(
            f.registry.peer(&addr("AA:BB")).await.unwrap().state,
            ConnectionState::Discovered
        );
        assert!(f.radio.commands().is_empty());

        // Next sighting after the grant opens the link
        f.gate.grant(Permission::Connect);
        f.registry.on_sighting(addr("AA:BB"), -62, None).await;
        assert_eq!(f.radio.open_links_for(&addr("AA:BB")), 1);
    }

    #[tokio::test]
    async fn test_link_failure_allows_retry_on_next_sighting() {
        let mut f = fixture();
        f.registry.on_sighting(addr("AA:BB"), -60, None).await;
        f.registry
            .on_link_failed(&addr("AA:BB"), ErrorCode::INTERNAL_ERROR)
            .await;

        assert_eq!(
            f.registry.peer(&addr("AA:BB")).await.unwrap().state,
            ConnectionState::Discovered
        );

        f.events.try_recv().unwrap();
        assert_eq!(
            f.events.try_recv().unwrap(),
            PeerEvent::LinkFailed {
                peer: addr("AA:BB"),
                code: ErrorCode::INTERNAL_ERROR
            }
        );

        // A second failure report for the same attempt is absorbed
        f.registry
            .on_link_failed(&addr("AA:BB"), ErrorCode::INTERNAL_ERROR)
            .await;
        assert!(f.events.try_recv().is_err());

        f.registry.on_sighting(addr("AA:BB"), -58, None).await;
        assert_eq!(f.radio.open_links_for(&addr("AA:BB")), 2);
    }

    #[tokio::test]
    async fn test_events_for_unknown_peer_are_absorbed() {
        let mut f = fixture();
        f.registry
            .on_link_state_change(&addr("CC:DD"), LinkState::Linked)
            .await;
        f.registry
            .on_services_enumerated(&addr("CC:DD"), EnumerationStatus::Success)
            .await;

        assert!(f.registry.is_empty().await);
        assert!(f.events.try_recv().is_err());
        assert!(f.radio.commands().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_unknown_peer_is_an_error() {
        let f = fixture();
        assert!(matches!(
            f.registry.disconnect(&addr("CC:DD")).await,
            Err(PeerlinkError::PeerNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_disconnect_all_closes_only_links() {
        let f = fixture();
        f.gate.deny(Permission::Connect);
        f.registry.on_sighting(addr("11:11"), -70, None).await;
        f.gate.grant(Permission::Connect);
        f.registry.on_sighting(addr("22:22"), -70, None).await;
        f.radio.clear();

        f.registry.disconnect_all().await;
        assert_eq!(f.radio.commands(), vec![RadioCommand::CloseLink(addr("22:22"))]);
    }

    #[tokio::test]
    async fn test_peers_listed_in_first_sighting_order() {
        let f = fixture();
        for address in ["33:33", "11:11", "22:22", "11:11"] {
            f.registry.on_sighting(addr(address), -50, None).await;
        }

        let order: Vec<String> = f
            .registry
            .peers()
            .await
            .iter()
            .map(|p| p.address().to_string())
            .collect();
        assert_eq!(order, vec!["33:33", "11:11", "22:22"]);
        assert_eq!(f.registry.count_in(ConnectionState::Connecting).await, 3);
    }

    /// Remove `address` from the table once `held` has been contended for
    async fn evict_while_held(
        registry: &PeerConnectionRegistry,
        address: &PeerAddress,
        held: OwnedMutexGuard<Peer>,
    ) {
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        let mut table = registry.peers.write().await;
        table.slots.remove(address);
        table.order.retain(|a| a != address);
        drop(table);
        drop(held);
    }

    #[tokio::test]
    async fn test_sighting_racing_eviction_registers_fresh_peer() {
        let mut f = fixture();
        f.gate.deny(Permission::Connect);
        f.registry.on_sighting(addr("AA:BB"), -60, None).await;
        f.events.try_recv().unwrap();
        f.gate.grant(Permission::Connect);

        let slot = f.registry.slot(&addr("AA:BB")).await.unwrap();
        let held = slot.lock_owned().await;
        let evicted = addr("AA:BB");
        tokio::join!(
            f.registry.on_sighting(addr("AA:BB"), -50, None),
            evict_while_held(&f.registry, &evicted, held),
        );

        let peer = f.registry.peer(&addr("AA:BB")).await.unwrap();
        assert_eq!(peer.state, ConnectionState::Connecting);
        assert_eq!(peer.rssi, -50);
        assert_eq!(f.registry.len().await, 1);
        assert_eq!(f.radio.open_links_for(&addr("AA:BB")), 1);
        assert_eq!(
            f.events.try_recv().unwrap(),
            PeerEvent::Discovered {
                peer: addr("AA:BB"),
                rssi: -50
            }
        );
    }

    #[tokio::test]
    async fn test_callback_for_evicted_peer_is_ignored() {
        let mut f = fixture();
        f.gate.deny(Permission::Connect);
        f.registry.on_sighting(addr("AA:BB"), -60, None).await;
        f.events.try_recv().unwrap();

        let slot = f.registry.slot(&addr("AA:BB")).await.unwrap();
        let held = slot.lock_owned().await;
        let target = addr("AA:BB");
        tokio::join!(
            f.registry.on_link_state_change(&target, LinkState::Unlinked),
            evict_while_held(&f.registry, &target, held),
        );

        assert!(f.registry.is_empty().await);
        assert!(f.events.try_recv().is_err());
    }
}
