//! btleplug-backed radio adapter
//!
//! [`BtleplugRadio`] implements the core's fire-and-forget [`RadioAdapter`].
//! Advertise and scan commands go through a single control task so they reach
//! the host stack in the order they were issued. Link commands are independent
//! of each other and run as one task each.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use btleplug::api::{Central, Manager as _, ScanFilter as HostScanFilter};
use btleplug::platform::{Adapter, Manager};
use peerlink_core::{
    AdvertisingParameters, PeerAddress, RadioAdapter, RadioEvent, RadioEventSender, ScanFilter,
    ScanMode,
};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::advertising::{BleAdvertiser, PlatformAdvertiser};
use crate::config::BleRadioConfig;
use crate::connection;
use crate::discovery::{run_event_pump, ActiveScan};
use crate::error::BleRadioError;

// ----------------------------------------------------------------------------
// Control Commands
// ----------------------------------------------------------------------------

/// Session commands processed in order by the control task
#[derive(Debug)]
enum ControlCommand {
    StartAdvertising(u64, AdvertisingParameters),
    StopAdvertising,
    StartScan(ScanFilter, ScanMode),
    StopScan,
}

struct ControlWorker {
    adapter: Adapter,
    advertiser: PlatformAdvertiser,
    active_scan: ActiveScan,
    events: RadioEventSender,
}

impl ControlWorker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<ControlCommand>) {
        while let Some(command) = commands.recv().await {
            self.process(command).await;
        }

        // Handle dropped: tear down whatever is still running
        if let Err(e) = self.advertiser.stop_advertising().await {
            warn!("Failed to stop advertising on shutdown: {}", e);
        }
        if self.active_scan.write().await.take().is_some() {
            if let Err(e) = self.adapter.stop_scan().await {
                warn!("Failed to stop scan on shutdown: {}", e);
            }
        }
        debug!("BLE control task stopped");
    }

    async fn process(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::StartAdvertising(attempt, params) => {
                match self.advertiser.start_advertising(&params).await {
                    Ok(()) => self.report(RadioEvent::AdvertisingStarted { attempt }),
                    Err(e) => {
                        error!("Failed to start advertising: {}", e);
                        self.report(RadioEvent::AdvertisingFailed {
                            attempt,
                            code: e.code(),
                        });
                    }
                }
            }
            ControlCommand::StopAdvertising => {
                if let Err(e) = self.advertiser.stop_advertising().await {
                    warn!("Failed to stop advertising: {}", e);
                }
            }
            ControlCommand::StartScan(filter, mode) => {
                // btleplug leaves the duty cycle to the host stack
                debug!("Requested scan mode {:?}", mode);
                let host_filter = HostScanFilter {
                    services: vec![filter.service_uuid],
                };
                *self.active_scan.write().await = Some(filter);

                if let Err(e) = self.adapter.start_scan(host_filter).await {
                    let e = BleRadioError::from(e);
                    error!("Failed to start BLE scan: {}", e);
                    *self.active_scan.write().await = None;
                    self.report(RadioEvent::ScanFailed { code: e.code() });
                } else {
                    info!("Started BLE scanning");
                }
            }
            ControlCommand::StopScan => {
                *self.active_scan.write().await = None;
                if let Err(e) = self.adapter.stop_scan().await {
                    warn!("Failed to stop BLE scan: {}", e);
                }
            }
        }
    }

    fn report(&self, event: RadioEvent) {
        if self.events.send(event).is_err() {
            debug!("Radio event receiver dropped, discarding session result");
        }
    }
}

// ----------------------------------------------------------------------------
// Radio Adapter
// ----------------------------------------------------------------------------

/// Radio adapter for the host's Bluetooth Low Energy controller
pub struct BtleplugRadio {
    adapter: Adapter,
    runtime: Handle,
    events: RadioEventSender,
    control: mpsc::UnboundedSender<ControlCommand>,
    radio_enabled: AtomicBool,
    advertising_supported: bool,
    connection_timeout: Duration,
    event_pump: JoinHandle<()>,
}

impl BtleplugRadio {
    /// Open the configured adapter and start the background tasks
    ///
    /// Results of every command are sent on `events`.
    pub async fn connect(config: BleRadioConfig, events: RadioEventSender) -> Result<Self, BleRadioError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .nth(config.adapter_index)
            .ok_or(BleRadioError::AdapterNotAvailable)?;

        match adapter.adapter_info().await {
            Ok(info) => info!("Using BLE adapter: {}", info),
            Err(e) => debug!("Adapter info unavailable: {}", e),
        }

        let mut advertiser = PlatformAdvertiser::new();
        let radio_enabled = match advertiser.initialize(config.power_on_adapter).await {
            Ok(powered) => powered,
            Err(e) => {
                warn!("Advertising backend unavailable: {}", e);
                true
            }
        };
        let advertising_supported = advertiser.supports_advertising();
        if !advertising_supported {
            warn!("This adapter cannot advertise; only scanning and linking are available");
        }

        let runtime = Handle::current();
        let active_scan: ActiveScan = Arc::new(RwLock::new(None));
        let (control, commands) = mpsc::unbounded_channel();

        let worker = ControlWorker {
            adapter: adapter.clone(),
            advertiser,
            active_scan: active_scan.clone(),
            events: events.clone(),
        };
        runtime.spawn(worker.run(commands));

        let pump_adapter = adapter.clone();
        let pump_events = events.clone();
        let event_pump = runtime.spawn(async move {
            if let Err(e) = run_event_pump(pump_adapter, active_scan, pump_events).await {
                error!("BLE event pump failed: {}", e);
            }
        });

        info!(
            "BLE radio ready (powered: {}, advertising: {})",
            radio_enabled, advertising_supported
        );

        Ok(Self {
            adapter,
            runtime,
            events,
            control,
            radio_enabled: AtomicBool::new(radio_enabled),
            advertising_supported,
            connection_timeout: config.connection_timeout,
            event_pump,
        })
    }

    /// Access the underlying btleplug adapter
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    fn send_control(&self, command: ControlCommand) {
        if self.control.send(command).is_err() {
            error!("BLE control task is not running");
            self.radio_enabled.store(false, Ordering::SeqCst);
        }
    }
}

impl RadioAdapter for BtleplugRadio {
    fn is_radio_enabled(&self) -> bool {
        self.radio_enabled.load(Ordering::SeqCst)
    }

    fn supports_advertising(&self) -> bool {
        self.advertising_supported
    }

    fn start_advertising(&self, attempt: u64, params: &AdvertisingParameters) {
        self.send_control(ControlCommand::StartAdvertising(attempt, params.clone()));
    }

    fn stop_advertising(&self) {
        self.send_control(ControlCommand::StopAdvertising);
    }

    fn start_scan(&self, filter: &ScanFilter, mode: ScanMode) {
        self.send_control(ControlCommand::StartScan(filter.clone(), mode));
    }

    fn stop_scan(&self) {
        self.send_control(ControlCommand::StopScan);
    }

    fn open_link(&self, peer: &PeerAddress) {
        self.runtime.spawn(connection::open_link(
            self.adapter.clone(),
            peer.clone(),
            self.connection_timeout,
            self.events.clone(),
        ));
    }

    fn close_link(&self, peer: &PeerAddress) {
        self.runtime.spawn(connection::close_link(
            self.adapter.clone(),
            peer.clone(),
            self.events.clone(),
        ));
    }

    fn enumerate_services(&self, peer: &PeerAddress) {
        self.runtime.spawn(connection::enumerate_services(
            self.adapter.clone(),
            peer.clone(),
            self.events.clone(),
        ));
    }
}

impl Drop for BtleplugRadio {
    fn drop(&mut self) {
        // The control task exits on its own once `control` is dropped
        self.event_pump.abort();
    }
}
