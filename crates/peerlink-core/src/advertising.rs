//! Advertising lifecycle
//!
//! One advertising session at a time. Starting is fire-and-forget: the radio
//! reports success or failure later, and a failure collapses the session back
//! to inactive. Every start is numbered, and results carrying an older number
//! belong to a session that has since been stopped, so they are absorbed.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::authorization::RadioGrant;
use crate::errors::{PeerlinkError, Result};
use crate::protocol::AdvertisingParameters;
use crate::radio::RadioAdapter;
use crate::sink::EventSink;
use crate::types::ErrorCode;

/// State of the single advertising session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisingSession {
    pub active: bool,
    /// Number of the most recent start request
    pub attempt: u64,
    pub last_error: Option<ErrorCode>,
}

impl AdvertisingSession {
    /// Whether a radio result for `attempt` concerns the live session
    fn is_current(&self, attempt: u64) -> bool {
        self.active && self.attempt == attempt
    }
}

/// Owns the "announcing" lifecycle
pub struct AdvertisingController {
    radio: Arc<dyn RadioAdapter>,
    sink: Arc<dyn EventSink>,
    params: AdvertisingParameters,
    session: Mutex<AdvertisingSession>,
}

impl AdvertisingController {
    pub fn new(
        radio: Arc<dyn RadioAdapter>,
        sink: Arc<dyn EventSink>,
        params: AdvertisingParameters,
    ) -> Self {
        Self {
            radio,
            sink,
            params,
            session: Mutex::new(AdvertisingSession::default()),
        }
    }

    /// Start advertising; a no-op while a session is already active
    pub async fn start(&self, _grant: &RadioGrant) -> Result<()> {
        if !self.radio.is_radio_enabled() {
            return Err(PeerlinkError::radio_unavailable(
                "radio is powered off or absent",
            ));
        }
        if !self.radio.supports_advertising() {
            return Err(PeerlinkError::radio_unavailable(
                "radio does not support advertising",
            ));
        }

        let mut session = self.session.lock().await;
        if session.active {
            debug!("Already advertising");
            return Ok(());
        }

        session.attempt += 1;
        self.radio.start_advertising(session.attempt, &self.params);
        session.active = true;
        session.last_error = None;
        info!(
            "Requested advertising for service {} (attempt {})",
            self.params.service_uuid, session.attempt
        );
        Ok(())
    }

    /// Stop advertising; a no-op when inactive
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        if !session.active {
            return;
        }
        self.radio.stop_advertising();
        session.active = false;
        info!("Stopped advertising");
    }

    /// Adapter confirmed that advertising is on air
    pub async fn on_started(&self, attempt: u64) {
        let mut session = self.session.lock().await;
        if session.is_current(attempt) {
            session.last_error = None;
            info!("Advertising started successfully");
        } else {
            debug!("Ignoring advertising confirmation for stale attempt {}", attempt);
        }
    }

    /// Adapter reported that advertising could not start
    pub async fn on_failed(&self, attempt: u64, code: ErrorCode) {
        let mut session = self.session.lock().await;
        if !session.is_current(attempt) {
            debug!(
                "Ignoring advertising failure {} for stale attempt {}",
                code, attempt
            );
            return;
        }
        session.active = false;
        session.last_error = Some(code);
        warn!("Failed to start advertising: {}", code);
        self.sink.on_advertising_failed(code);
    }

    pub async fn is_active(&self) -> bool {
        self.session.lock().await.active
    }

    pub async fn session(&self) -> AdvertisingSession {
        self.session.lock().await.clone()
    }

    pub fn parameters(&self) -> &AdvertisingParameters {
        &self.params
    }
}
