use std::collections::{BTreeMap, BTreeSet};

use crate::{
    ConnectivityMismatch, DuplicateMember, DuplicateNameFinding, PortMappingDiff, PortRecord,
    RawDvsPort, SegmentMembership, SegmentMismatch,
};

/// Group in-scope DVS ports by configured name; any name carried by more than
/// one port is a finding. Blank names are ignored.
///
/// Grouping uses the raw name rather than normalized records: a duplicate is a
/// configuration defect whether or not the port correlates with Neutron.
pub fn check_duplicate_names(ports: &[RawDvsPort]) -> Vec<DuplicateNameFinding> {
    let mut by_name: BTreeMap<&str, Vec<DuplicateMember>> = BTreeMap::new();
    for p in ports {
        if p.configured_name().is_none() {
            continue;
        }
        let name = p.name.as_deref().unwrap_or_default();
        by_name.entry(name).or_default().push(DuplicateMember {
            backing: p.key.clone(),
            segment_key: p.portgroup_key.clone(),
            connected: p.is_connected(),
        });
    }

    by_name
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(name, members)| DuplicateNameFinding {
            name: name.to_string(),
            members,
        })
        .collect()
}

/// Compare the device each correlated port is plugged into.
///
/// Only Neutron ports with a same-id DVS port are evaluated; a DVS port with
/// no device against a Neutron port with one is a mismatch.
pub fn check_connectivity(dvs: &[PortRecord], neutron: &[PortRecord]) -> Vec<ConnectivityMismatch> {
    let mut out = Vec::new();
    for os_rec in neutron {
        for dvs_rec in dvs.iter().filter(|d| d.port_id == os_rec.port_id) {
            if dvs_rec.device_id != os_rec.device_id {
                out.push(ConnectivityMismatch {
                    port_id: os_rec.port_id.clone(),
                    expected_device_id: os_rec.device_id.clone(),
                    actual_device_id: dvs_rec.device_id.clone(),
                });
            }
        }
    }
    out.sort();
    out
}

/// Per VM, compare the portgroups it is attached to against the ones its
/// Neutron ports expect.
///
/// A VM with no Neutron ports expects nothing, so every attached portgroup is
/// unexpected.
pub fn check_segment_membership(
    actual: &[SegmentMembership],
    neutron: &[PortRecord],
) -> Vec<SegmentMismatch> {
    let mut expected_by_device: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for rec in neutron {
        if let Some(device_id) = rec.device_id.as_deref() {
            expected_by_device
                .entry(device_id)
                .or_default()
                .insert(rec.segment_name.as_str());
        }
    }

    let empty = BTreeSet::new();
    let mut out = Vec::new();
    for membership in actual {
        let expected = expected_by_device
            .get(membership.device_identity.as_str())
            .unwrap_or(&empty);
        let attached: BTreeSet<&str> = membership.segment_names.iter().map(String::as_str).collect();

        let missing: Vec<String> = expected.difference(&attached).map(|s| s.to_string()).collect();
        let extra: Vec<String> = attached.difference(expected).map(|s| s.to_string()).collect();

        if !missing.is_empty() || !extra.is_empty() {
            out.push(SegmentMismatch {
                device_ref: membership.device_ref.clone(),
                device_identity: membership.device_identity.clone(),
                missing_segments: missing,
                extra_segments: extra,
            });
        }
    }
    out.sort();
    out
}

/// Port ids present on only one side. Blank DVS names are counted, not compared.
pub fn check_port_mapping(dvs: &[PortRecord], neutron: &[PortRecord]) -> PortMappingDiff {
    let mut unnamed = 0;
    let mut dvs_ids = BTreeSet::new();
    for rec in dvs {
        if rec.port_id.trim().is_empty() {
            unnamed += 1;
        } else {
            dvs_ids.insert(rec.port_id.as_str());
        }
    }
    let os_ids: BTreeSet<&str> = neutron.iter().map(|r| r.port_id.as_str()).collect();

    PortMappingDiff {
        authoritative_only: dvs_ids.difference(&os_ids).map(|s| s.to_string()).collect(),
        reference_only: os_ids.difference(&dvs_ids).map(|s| s.to_string()).collect(),
        unnamed_authoritative: unnamed,
    }
}
