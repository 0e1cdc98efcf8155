//! Error types for the peer link core
//!
//! Only synchronous failures are represented here. Asynchronous adapter
//! failures are surfaced through the [`EventSink`](crate::EventSink), and late
//! or repeated adapter callbacks are absorbed without producing an error.

use thiserror::Error;

use crate::authorization::Permission;
use crate::types::{ErrorCode, PeerAddress};

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Main error type for peer link operations
#[derive(Debug, Error)]
pub enum PeerlinkError {
    #[error("Radio unavailable: {reason}")]
    RadioUnavailable { reason: String },

    #[error("Missing runtime permissions: {}", format_permissions(.missing))]
    PermissionDenied { missing: Vec<Permission> },

    #[error("Adapter command {operation} failed: {code}")]
    AdapterCommandFailure {
        operation: &'static str,
        code: ErrorCode,
    },

    #[error("Peer not found: {peer}")]
    PeerNotFound { peer: PeerAddress },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl PeerlinkError {
    pub fn radio_unavailable(reason: impl Into<String>) -> Self {
        Self::RadioUnavailable {
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

/// Result type for peer link operations
pub type Result<T> = std::result::Result<T, PeerlinkError>;

/// Errors produced by the per-peer connection state machine
///
/// The registry treats every one of these as a duplicate or late adapter
/// callback and absorbs it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateTransitionError {
    #[error("Invalid transition from {from_state} on event {event}")]
    InvalidTransition {
        from_state: &'static str,
        event: String,
    },
}

fn format_permissions(missing: &[Permission]) -> String {
    missing
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_lists_permissions() {
        let err = PeerlinkError::PermissionDenied {
            missing: vec![Permission::Scan, Permission::Connect],
        };
        assert_eq!(err.to_string(), "Missing runtime permissions: scan, connect");
    }

    #[test]
    fn test_adapter_failure_message() {
        let err = PeerlinkError::AdapterCommandFailure {
            operation: "start_scan",
            code: ErrorCode::FEATURE_UNSUPPORTED,
        };
        assert_eq!(
            err.to_string(),
            "Adapter command start_scan failed: 5 (feature unsupported)"
        );
    }
}
