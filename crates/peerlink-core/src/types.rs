//! Value types shared by the controllers, the registry and radio adapters

use std::fmt;

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Peer Identity
// ----------------------------------------------------------------------------

/// Radio-assigned, address-like peer identifier
///
/// Opaque to the core. It is unique per physical device for the lifetime of a
/// session and never changes once a peer has been created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerAddress(String);

impl PeerAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for PeerAddress {
    fn from(address: String) -> Self {
        Self(address)
    }
}

/// Received signal strength in dBm
pub type Rssi = i16;

// ----------------------------------------------------------------------------
// Adapter Results
// ----------------------------------------------------------------------------

/// Link state reported by the radio for a single peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkState {
    Linked,
    Unlinked,
}

/// Outcome of a service enumeration request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnumerationStatus {
    Success,
    Failure(ErrorCode),
}

impl EnumerationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, EnumerationStatus::Success)
    }
}

/// Failure code reported asynchronously by a radio adapter
///
/// The named constants follow the advertise/scan failure codes of mobile BLE
/// stacks; adapters without numeric codes map their errors onto them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    pub const ALREADY_STARTED: ErrorCode = ErrorCode(1);
    pub const DATA_TOO_LARGE: ErrorCode = ErrorCode(2);
    pub const TOO_MANY_ADVERTISERS: ErrorCode = ErrorCode(3);
    pub const INTERNAL_ERROR: ErrorCode = ErrorCode(4);
    pub const FEATURE_UNSUPPORTED: ErrorCode = ErrorCode(5);
    pub const REGISTRATION_FAILED: ErrorCode = ErrorCode(6);
    pub const PERMISSION_DENIED: ErrorCode = ErrorCode(7);
    pub const PEER_NOT_FOUND: ErrorCode = ErrorCode(8);
    pub const SERVICE_NOT_FOUND: ErrorCode = ErrorCode(9);

    /// Short human-readable description for logs and UIs
    pub fn description(&self) -> &'static str {
        match *self {
            Self::ALREADY_STARTED => "already started",
            Self::DATA_TOO_LARGE => "data too large",
            Self::TOO_MANY_ADVERTISERS => "too many advertisers",
            Self::INTERNAL_ERROR => "internal error",
            Self::FEATURE_UNSUPPORTED => "feature unsupported",
            Self::REGISTRATION_FAILED => "registration failed",
            Self::PERMISSION_DENIED => "permission denied",
            Self::PEER_NOT_FOUND => "peer not found",
            Self::SERVICE_NOT_FOUND => "service not found",
            _ => "unknown error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.description())
    }
}
