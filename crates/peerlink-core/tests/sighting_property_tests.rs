//! Property-based tests for sighting deduplication
//!
//! Repeated sightings of the same address must never create a second peer,
//! reorder the peer list, or open more than one link.

use std::collections::HashMap;
use std::sync::Arc;

use peerlink_core::testing::MockRadio;
use peerlink_core::{AllowAll, ChannelSink, PeerAddress, PeerConnectionRegistry, Rssi};
use proptest::prelude::*;

/// A small address space so sequences revisit the same peers
fn arb_address() -> impl Strategy<Value = String> {
    (0u8..6).prop_map(|i| format!("AA:BB:CC:DD:EE:{:02X}", i))
}

fn arb_sighting() -> impl Strategy<Value = (String, Rssi)> {
    (arb_address(), -100i16..=0)
}

fn run_sightings(sightings: &[(String, Rssi)]) -> (Arc<MockRadio>, PeerConnectionRegistry) {
    let radio = Arc::new(MockRadio::new());
    let (sink, _events) = ChannelSink::new();
    let registry = PeerConnectionRegistry::new(radio.clone(), Arc::new(sink), Arc::new(AllowAll));

    tokio_test::block_on(async {
        for (address, rssi) in sightings {
            registry
                .on_sighting(PeerAddress::from(address.as_str()), *rssi, None)
                .await;
        }
    });
    (radio, registry)
}

proptest! {
    /// Property: peers appear once each, in order of first sighting
    #[test]
    fn identity_and_order_are_stable(sightings in prop::collection::vec(arb_sighting(), 1..64)) {
        let (_radio, registry) = run_sightings(&sightings);

        let mut expected_order: Vec<String> = Vec::new();
        for (address, _) in &sightings {
            if !expected_order.contains(address) {
                expected_order.push(address.clone());
            }
        }

        let peers = tokio_test::block_on(registry.peers());
        let order: Vec<String> = peers.iter().map(|p| p.address().to_string()).collect();
        prop_assert_eq!(order, expected_order);
    }

    /// Property: each peer carries the signal strength of its latest sighting
    #[test]
    fn rssi_is_latest(sightings in prop::collection::vec(arb_sighting(), 1..64)) {
        let (_radio, registry) = run_sightings(&sightings);

        let mut latest: HashMap<String, Rssi> = HashMap::new();
        for (address, rssi) in &sightings {
            latest.insert(address.clone(), *rssi);
        }

        for peer in tokio_test::block_on(registry.peers()) {
            prop_assert_eq!(Some(&peer.rssi), latest.get(peer.address().as_str()));
        }
    }

    /// Property: without link callbacks, every peer gets exactly one link-open
    #[test]
    fn one_link_open_per_peer(sightings in prop::collection::vec(arb_sighting(), 1..64)) {
        let (radio, registry) = run_sightings(&sightings);

        for peer in tokio_test::block_on(registry.peers()) {
            prop_assert_eq!(radio.open_links_for(peer.address()), 1);
            prop_assert_eq!(peer.link_attempts, 1);
        }
    }
}
