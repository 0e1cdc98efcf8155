//! Runtime authorization gate
//!
//! Platforms with a runtime permission model (mobile OSes) must confirm the
//! radio permissions and radio power before any session is started. The core
//! never requests permissions itself; instead the caller presents a
//! [`RadioGrant`], which can only be obtained once the gate reports every
//! required permission as granted and the radio as enabled.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::{PeerlinkError, Result};
use crate::radio::RadioAdapter;

// ----------------------------------------------------------------------------
// Permissions
// ----------------------------------------------------------------------------

/// A runtime permission required by radio operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    Scan,
    Advertise,
    /// Needed for every link-open attempt
    Connect,
    FineLocation,
}

impl Permission {
    /// Everything that must be granted before a session can start
    pub const REQUIRED: [Permission; 4] = [
        Permission::Scan,
        Permission::Advertise,
        Permission::Connect,
        Permission::FineLocation,
    ];
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::Scan => "scan",
            Permission::Advertise => "advertise",
            Permission::Connect => "connect",
            Permission::FineLocation => "fine-location",
        };
        f.write_str(name)
    }
}

/// Platform glue answering whether a permission is currently granted
pub trait PermissionGate: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;
}

/// Gate for platforms without runtime permissions (desktop BlueZ, CoreBluetooth)
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn is_granted(&self, _permission: Permission) -> bool {
        true
    }
}

// ----------------------------------------------------------------------------
// Capability Token
// ----------------------------------------------------------------------------

/// Proof that authorization was confirmed and the radio was powered on
#[derive(Debug)]
pub struct RadioGrant {
    _sealed: (),
}

impl RadioGrant {
    /// Check the gate and the radio, returning a grant if both allow it
    pub fn acquire(gate: &dyn PermissionGate, radio: &dyn RadioAdapter) -> Result<Self> {
        let missing: SmallVec<[Permission; 4]> = Permission::REQUIRED
            .iter()
            .copied()
            .filter(|permission| !gate.is_granted(*permission))
            .collect();

        if !missing.is_empty() {
            return Err(PeerlinkError::PermissionDenied {
                missing: missing.into_vec(),
            });
        }

        if !radio.is_radio_enabled() {
            return Err(PeerlinkError::radio_unavailable(
                "radio is powered off or absent",
            ));
        }

        Ok(Self { _sealed: () })
    }
}
