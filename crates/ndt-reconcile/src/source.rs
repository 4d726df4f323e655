//! Collaborator boundary for both inventories.
//!
//! This module defines **only** the traits the engine consumes and their
//! error types. Session handling, pagination and the RPC transport behind
//! them belong to the implementations.

use std::fmt;

use crate::{PortHandle, PortScope, RawDevice, RawDvsPort, RawNeutronPort, Segment, SegmentKey};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to read an inventory. Aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Connection or transport failure.
    Transport(String),
    /// The platform answered with an error.
    Api(String),
    /// A payload could not be decoded.
    Decode(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Transport(msg) => write!(f, "inventory transport error: {msg}"),
            SourceError::Api(msg) => write!(f, "inventory api error: {msg}"),
            SourceError::Decode(msg) => write!(f, "inventory decode error: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// A corrective operation rejected by the DVS. Carries the platform's own
/// error text; never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OperationError {
    pub message: String,
}

impl OperationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for OperationError {}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Read side of the DVS.
pub trait DvsSource {
    /// Ports on the switch. Implementations may pre-filter with `scope`; the
    /// engine applies it again either way.
    fn list_ports(&self, scope: &PortScope) -> Result<Vec<RawDvsPort>, SourceError>;

    /// VMs with their stable identity and attached portgroups.
    fn list_devices(&self) -> Result<Vec<RawDevice>, SourceError>;

    /// Portgroups on the switch.
    fn list_segments(&self) -> Result<Vec<Segment>, SourceError>;
}

/// Write side of the DVS.
///
/// Every call blocks until the platform confirms the change (or rejects it).
/// Each operation targets an idempotent end state.
pub trait DvsSink {
    fn rename(&mut self, port: &PortHandle, new_name: &str) -> Result<(), OperationError>;

    fn move_port(&mut self, port: &PortHandle, destination: &SegmentKey) -> Result<(), OperationError>;

    /// Detach the VM adapter plugged into `port`.
    fn disconnect(&mut self, port: &PortHandle) -> Result<(), OperationError>;
}

/// Read side of Neutron.
pub trait NeutronSource {
    /// Ports, optionally restricted to those bound to `host`.
    fn list_ports(&self, host: Option<&str>) -> Result<Vec<RawNeutronPort>, SourceError>;
}
