//! In-memory collaborators for tests and simulations
//!
//! [`MockRadio`] records every command it receives instead of touching real
//! hardware; tests play the radio's part by feeding [`RadioEvent`]s into the
//! node or calling the registry directly. A radio built with
//! [`MockRadio::with_events`] also confirms closed links on that channel.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::authorization::{Permission, PermissionGate};
use crate::protocol::{AdvertisingParameters, ScanFilter, ScanMode};
use crate::radio::{RadioAdapter, RadioEvent, RadioEventSender};
use crate::types::{LinkState, PeerAddress};

// ----------------------------------------------------------------------------
// Mock Radio
// ----------------------------------------------------------------------------

/// A command received by [`MockRadio`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCommand {
    StartAdvertising(u64, AdvertisingParameters),
    StopAdvertising,
    StartScan(ScanFilter, ScanMode),
    StopScan,
    OpenLink(PeerAddress),
    CloseLink(PeerAddress),
    EnumerateServices(PeerAddress),
}

/// Radio adapter that records commands
#[derive(Debug)]
pub struct MockRadio {
    enabled: AtomicBool,
    advertising_supported: AtomicBool,
    commands: Mutex<Vec<RadioCommand>>,
    events: Option<RadioEventSender>,
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRadio {
    /// A powered-on radio that supports advertising
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            advertising_supported: AtomicBool::new(true),
            commands: Mutex::new(Vec::new()),
            events: None,
        }
    }

    /// Report `Unlinked` on `events` for every closed link
    pub fn with_events(mut self, events: RadioEventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// A radio that reports itself powered off
    pub fn disabled() -> Self {
        let radio = Self::new();
        radio.set_enabled(false);
        radio
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_advertising_supported(&self, supported: bool) {
        self.advertising_supported.store(supported, Ordering::SeqCst);
    }

    /// Snapshot of every command received so far
    pub fn commands(&self) -> Vec<RadioCommand> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, predicate: impl Fn(&RadioCommand) -> bool) -> usize {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|command| predicate(command))
            .count()
    }

    /// Number of link-open commands issued for `peer`
    pub fn open_links_for(&self, peer: &PeerAddress) -> usize {
        self.count(|command| matches!(command, RadioCommand::OpenLink(p) if p == peer))
    }

    pub fn clear(&self) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, command: RadioCommand) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }
}

impl RadioAdapter for MockRadio {
    fn is_radio_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn supports_advertising(&self) -> bool {
        self.advertising_supported.load(Ordering::SeqCst)
    }

    fn start_advertising(&self, attempt: u64, params: &AdvertisingParameters) {
        self.record(RadioCommand::StartAdvertising(attempt, params.clone()));
    }

    fn stop_advertising(&self) {
        self.record(RadioCommand::StopAdvertising);
    }

    fn start_scan(&self, filter: &ScanFilter, mode: ScanMode) {
        self.record(RadioCommand::StartScan(filter.clone(), mode));
    }

    fn stop_scan(&self) {
        self.record(RadioCommand::StopScan);
    }

    fn open_link(&self, peer: &PeerAddress) {
        self.record(RadioCommand::OpenLink(peer.clone()));
    }

    fn close_link(&self, peer: &PeerAddress) {
        self.record(RadioCommand::CloseLink(peer.clone()));
        if let Some(events) = &self.events {
            let _ = events.send(RadioEvent::LinkStateChanged {
                peer: peer.clone(),
                state: LinkState::Unlinked,
            });
        }
    }

    fn enumerate_services(&self, peer: &PeerAddress) {
        self.record(RadioCommand::EnumerateServices(peer.clone()));
    }
}

// ----------------------------------------------------------------------------
// Mock Permission Gate
// ----------------------------------------------------------------------------

/// Permission gate granting everything except explicitly denied permissions
#[derive(Debug, Default)]
pub struct MockGate {
    denied: Mutex<HashSet<Permission>>,
}

impl MockGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(&self, permission: Permission) {
        self.denied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(permission);
    }

    pub fn grant(&self, permission: Permission) {
        self.denied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&permission);
    }
}

impl PermissionGate for MockGate {
    fn is_granted(&self, permission: Permission) -> bool {
        !self
            .denied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&permission)
    }
}
