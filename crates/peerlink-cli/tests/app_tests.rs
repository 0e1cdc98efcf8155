//! Application-level tests running the node against a recording radio

use std::sync::Arc;
use std::time::Duration;

use peerlink_cli::{AppConfig, CliError, Mode, PeerlinkApp};
use peerlink_core::testing::{MockGate, MockRadio, RadioCommand};
use peerlink_core::{
    radio_event_channel, AllowAll, ConnectionState, EnumerationStatus, LinkState, PeerAddress,
    Permission, PeerlinkError, RadioEvent, RadioEventReceiver, RadioEventSender, TracingSink,
};

fn app(radio: &Arc<MockRadio>) -> (PeerlinkApp, RadioEventSender) {
    let (tx, rx) = radio_event_channel();
    (app_with_events(radio, rx), tx)
}

fn app_with_events(radio: &Arc<MockRadio>, rx: RadioEventReceiver) -> PeerlinkApp {
    PeerlinkApp::with_parts(
        &AppConfig::default(),
        radio.clone(),
        rx,
        Arc::new(TracingSink),
        Arc::new(AllowAll),
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_run_reports_final_device_list() {
    let (tx, rx) = radio_event_channel();
    let radio = Arc::new(MockRadio::new().with_events(tx.clone()));
    let app = app_with_events(&radio, rx);
    let peer = PeerAddress::from("AA:BB");

    for event in [
        RadioEvent::Sighting {
            peer: peer.clone(),
            rssi: -60,
            name: Some("phone".into()),
        },
        RadioEvent::LinkStateChanged {
            peer: peer.clone(),
            state: LinkState::Linked,
        },
        RadioEvent::ServicesEnumerated {
            peer: peer.clone(),
            status: EnumerationStatus::Success,
        },
    ] {
        tx.send(event).unwrap();
    }

    // Queued events are applied before the paused clock reaches the deadline
    let rows = app
        .run_until(Mode::Both, tokio::time::sleep(Duration::from_secs(1)))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].address, "AA:BB");
    assert_eq!(rows[0].name.as_deref(), Some("phone"));
    assert_eq!(rows[0].state, ConnectionState::Disconnected);

    let commands = radio.commands();
    assert!(matches!(commands[0], RadioCommand::StartAdvertising(..)));
    assert!(matches!(commands[1], RadioCommand::StartScan(..)));
    assert!(commands.contains(&RadioCommand::OpenLink(peer.clone())));
    assert!(commands.contains(&RadioCommand::EnumerateServices(peer.clone())));
    assert_eq!(commands.last(), Some(&RadioCommand::CloseLink(peer)));
}

#[tokio::test(start_paused = true)]
async fn test_scan_only_stops_after_duration() {
    let radio = Arc::new(MockRadio::new());
    let (app, _tx) = app(&radio);

    let rows = app
        .run(Mode::ScanOnly, Some(Duration::from_secs(5)))
        .await
        .unwrap();

    assert!(rows.is_empty());
    assert_eq!(
        radio.count(|c| matches!(c, RadioCommand::StartAdvertising(..))),
        0
    );
    assert_eq!(radio.count(|c| matches!(c, RadioCommand::StartScan(..))), 1);
    assert_eq!(radio.count(|c| matches!(c, RadioCommand::StopScan)), 1);
}

#[tokio::test]
async fn test_missing_permission_aborts_before_any_session() {
    let radio = Arc::new(MockRadio::new());
    let gate = Arc::new(MockGate::new());
    gate.deny(Permission::Advertise);
    let (_tx, rx) = radio_event_channel();

    let app = PeerlinkApp::with_parts(
        &AppConfig::default(),
        radio.clone(),
        rx,
        Arc::new(TracingSink),
        gate,
    )
    .unwrap();

    let result = app.run_until(Mode::Both, async {}).await;
    assert!(matches!(
        result,
        Err(CliError::Core(PeerlinkError::PermissionDenied { .. }))
    ));
    assert!(radio.commands().is_empty());
}

#[tokio::test]
async fn test_disabled_radio_is_reported() {
    let radio = Arc::new(MockRadio::disabled());
    let (app, _tx) = app(&radio);

    let result = app.run_until(Mode::ScanOnly, async {}).await;
    assert!(matches!(
        result,
        Err(CliError::Core(PeerlinkError::RadioUnavailable { .. }))
    ));
}
