//! ndt-reconcile
//!
//! DVS / Neutron port reconciliation engine.
//!
//! Architectural decisions:
//! - The DVS is the authoritative side: the only side ever mutated
//! - Neutron is the reference side: ground truth, never mutated
//! - Checks are read-only and never abort each other
//! - Corrective operations are isolated per port: one failure never aborts the batch
//!
//! Deterministic logic over normalized snapshots. The only IO is through the
//! [`source`] traits and the [`report`] writer.

mod checks;
mod engine;
mod executor;
mod naming;
mod normalizer;
pub mod report;
mod scope;
pub mod snapshot_adapter;
pub mod source;
mod types;

pub use checks::{
    check_connectivity, check_duplicate_names, check_port_mapping, check_segment_membership,
};
pub use engine::{align, check, collect, CheckReport, Inventory};
pub use executor::{
    execute, plan, AlignAuthorization, AlignNotAuthorized, AlignOptions, AlignReport, CorrectiveOp,
    DisconnectPolicy, OperationFailure, OperationOutcome,
};
pub use naming::{derive, portgroup_name, MAX_SEGMENT_NAME_LEN, SWITCH_SUFFIX_LEN};
pub use normalizer::{
    device_memberships, normalize_dvs_ports, normalize_dvs_ports_lenient, normalize_neutron_ports,
};
pub use scope::PortScope;
pub use types::*;
