//! Inventory normalizer: raw DVS / Neutron objects into [`PortRecord`]s.
//!
//! Pure transformation. The only failure is a data-integrity one: a record
//! referencing a portgroup or VM its own side does not know about. Such
//! records are surfaced as [`UnresolvedReference`], never silently dropped.

use std::collections::BTreeSet;

use crate::naming::portgroup_name;
use crate::{
    DeviceTable, PortRecord, RawDvsPort, RawNeutronPort, SegmentMembership, SegmentTable,
    UnresolvedReference,
};

fn normalize_dvs_port(
    port: &RawDvsPort,
    segments: &SegmentTable,
    devices: &DeviceTable,
) -> Result<PortRecord, UnresolvedReference> {
    let segment_name = segments
        .name_of(&port.portgroup_key)
        .ok_or_else(|| UnresolvedReference::Segment {
            port: port.key.clone(),
            segment_key: port.portgroup_key.clone(),
        })?;

    let device_id = match port.connected_vm() {
        Some(vm_ref) => Some(devices.identity_of(vm_ref).ok_or_else(|| {
            UnresolvedReference::Device {
                port: port.key.clone(),
                device_ref: vm_ref.clone(),
            }
        })?),
        None => None,
    };

    Ok(PortRecord {
        port_id: port.name.clone().unwrap_or_default(),
        segment_name: segment_name.to_string(),
        device_id: device_id.map(str::to_string),
        backing: port.key.clone(),
    })
}

/// Normalize in-scope DVS ports.
///
/// # Errors
/// Returns the first [`UnresolvedReference`] encountered, in input order.
/// See [`normalize_dvs_ports_lenient`] for the variant that keeps going.
pub fn normalize_dvs_ports(
    ports: &[RawDvsPort],
    segments: &SegmentTable,
    devices: &DeviceTable,
) -> Result<Vec<PortRecord>, UnresolvedReference> {
    ports
        .iter()
        .map(|p| normalize_dvs_port(p, segments, devices))
        .collect()
}

/// Lenient variant: unresolvable ports are left out of the records and
/// returned as findings instead.
pub fn normalize_dvs_ports_lenient(
    ports: &[RawDvsPort],
    segments: &SegmentTable,
    devices: &DeviceTable,
) -> (Vec<PortRecord>, Vec<UnresolvedReference>) {
    let mut records = Vec::with_capacity(ports.len());
    let mut unresolved = Vec::new();

    for port in ports {
        match normalize_dvs_port(port, segments, devices) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(error = %e, "unresolved DVS port reference");
                unresolved.push(e);
            }
        }
    }

    (records, unresolved)
}

/// Normalize Neutron ports; the segment name is the derived portgroup name.
pub fn normalize_neutron_ports(switch_identity: &str, ports: &[RawNeutronPort]) -> Vec<PortRecord> {
    ports
        .iter()
        .map(|p| {
            let device_id = p.device_id.trim();
            PortRecord {
                port_id: p.id.clone(),
                segment_name: portgroup_name(switch_identity, &p.network_id, &p.security_groups),
                device_id: (!device_id.is_empty()).then(|| device_id.to_string()),
                backing: crate::PortHandle::new(p.id.clone()),
            }
        })
        .collect()
}

/// Portgroup names each VM is actually attached to on the DVS.
///
/// Network keys missing from the segment table are reported and left out of
/// that VM's set.
pub fn device_memberships(
    devices: &DeviceTable,
    segments: &SegmentTable,
) -> (Vec<SegmentMembership>, Vec<UnresolvedReference>) {
    let mut memberships = Vec::with_capacity(devices.len());
    let mut unresolved = Vec::new();

    for device in devices.iter() {
        let mut names = BTreeSet::new();
        for key in &device.segment_keys {
            match segments.name_of(key) {
                Some(name) => {
                    names.insert(name.to_string());
                }
                None => {
                    let e = UnresolvedReference::DeviceSegment {
                        device_ref: device.device_ref.clone(),
                        segment_key: key.clone(),
                    };
                    tracing::warn!(error = %e, "unresolved VM network reference");
                    unresolved.push(e);
                }
            }
        }
        memberships.push(SegmentMembership {
            device_ref: device.device_ref.clone(),
            device_identity: device.identity.clone(),
            segment_names: names,
        });
    }

    (memberships, unresolved)
}
