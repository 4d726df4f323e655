use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque side-specific port handle (DVS port key / Neutron port id).
///
/// Only ever passed back into a [`crate::source::DvsSink`]; never compared
/// when correlating ports across sides.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortHandle(pub String);

impl PortHandle {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// DVS portgroup key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentKey(pub String);

impl SegmentKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Platform reference of a VM (managed object id), as seen by DVS connectees.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceRef(pub String);

impl DeviceRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Raw collaborator objects
// ---------------------------------------------------------------------------

/// What a DVS port is plugged into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnecteeKind {
    /// Virtual machine network adapter.
    VmVnic,
    /// Host virtual NIC (vmkernel).
    HostVmknic,
    /// Physical uplink.
    Uplink,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connectee {
    pub kind: ConnecteeKind,
    /// Connected entity reference (a VM ref for `VmVnic`).
    pub entity: DeviceRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nic_key: Option<i32>,
}

/// DVS port as exposed by the authoritative-side inventory source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDvsPort {
    pub key: PortHandle,
    /// Configured port name; `None` and blank are both "unnamed".
    #[serde(default)]
    pub name: Option<String>,
    pub portgroup_key: SegmentKey,
    #[serde(default)]
    pub connectee: Option<Connectee>,
}

impl RawDvsPort {
    /// Configured name, trimmed; `None` when blank.
    pub fn configured_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    pub fn is_connected(&self) -> bool {
        self.connectee.is_some()
    }

    /// VM the port is plugged into, if the connectee is a VM adapter.
    pub fn connected_vm(&self) -> Option<&DeviceRef> {
        self.connectee
            .as_ref()
            .filter(|c| c.kind == ConnecteeKind::VmVnic)
            .map(|c| &c.entity)
    }
}

/// VM as exposed by the authoritative-side inventory source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDevice {
    pub vm_ref: DeviceRef,
    /// Stable identity (`config.instanceUuid`).
    pub instance_uuid: String,
    /// Portgroups the VM is currently attached to.
    #[serde(default)]
    pub networks: Vec<SegmentKey>,
}

/// Neutron port as exposed by the reference-side inventory source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNeutronPort {
    pub id: String,
    #[serde(default)]
    pub device_id: String,
    pub network_id: String,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_host_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Lookup tables (built once per run, read-only afterwards)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub key: SegmentKey,
    pub name: String,
}

impl Segment {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: SegmentKey::new(key),
            name: name.into(),
        }
    }
}

/// Portgroup key -> portgroup, with a reverse name index for moves.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SegmentTable {
    by_key: BTreeMap<SegmentKey, Segment>,
    by_name: BTreeMap<String, SegmentKey>,
}

impl SegmentTable {
    /// On duplicate portgroup names the first key wins the reverse index.
    pub fn build(segments: impl IntoIterator<Item = Segment>) -> Self {
        let mut table = Self::default();
        for seg in segments {
            table
                .by_name
                .entry(seg.name.clone())
                .or_insert_with(|| seg.key.clone());
            table.by_key.insert(seg.key.clone(), seg);
        }
        table
    }

    pub fn get(&self, key: &SegmentKey) -> Option<&Segment> {
        self.by_key.get(key)
    }

    pub fn name_of(&self, key: &SegmentKey) -> Option<&str> {
        self.by_key.get(key).map(|s| s.name.as_str())
    }

    pub fn key_for_name(&self, name: &str) -> Option<&SegmentKey> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Device {
    pub device_ref: DeviceRef,
    pub identity: String,
    pub segment_keys: Vec<SegmentKey>,
}

/// VM ref -> device. Iteration order is by ref (deterministic).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceTable {
    devices: BTreeMap<DeviceRef, Device>,
}

impl DeviceTable {
    pub fn build(raw: impl IntoIterator<Item = RawDevice>) -> Self {
        let devices = raw
            .into_iter()
            .map(|d| {
                (
                    d.vm_ref.clone(),
                    Device {
                        device_ref: d.vm_ref,
                        identity: d.instance_uuid,
                        segment_keys: d.networks,
                    },
                )
            })
            .collect();
        Self { devices }
    }

    pub fn get(&self, device_ref: &DeviceRef) -> Option<&Device> {
        self.devices.get(device_ref)
    }

    pub fn identity_of(&self, device_ref: &DeviceRef) -> Option<&str> {
        self.devices.get(device_ref).map(|d| d.identity.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Normalized records
// ---------------------------------------------------------------------------

/// Side-neutral port shape both inventories normalize into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortRecord {
    pub port_id: String,
    pub segment_name: String,
    pub device_id: Option<String>,
    pub backing: PortHandle,
}

impl PortRecord {
    pub fn new(
        port_id: impl Into<String>,
        segment_name: impl Into<String>,
        device_id: Option<&str>,
        backing: impl Into<String>,
    ) -> Self {
        Self {
            port_id: port_id.into(),
            segment_name: segment_name.into(),
            device_id: device_id.map(str::to_string),
            backing: PortHandle::new(backing),
        }
    }

    /// Identifier, segment and device all agree.
    pub fn matches_exactly(&self, other: &PortRecord) -> bool {
        self.port_id == other.port_id
            && self.segment_name == other.segment_name
            && self.device_id == other.device_id
    }
}

/// Segment names a device is attached to (DVS side) or expected on (Neutron side).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentMembership {
    pub device_ref: DeviceRef,
    pub device_identity: String,
    pub segment_names: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DuplicateMember {
    pub backing: PortHandle,
    pub segment_key: SegmentKey,
    pub connected: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DuplicateNameFinding {
    pub name: String,
    pub members: Vec<DuplicateMember>,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConnectivityMismatch {
    pub port_id: String,
    /// Neutron `device_id`.
    pub expected_device_id: Option<String>,
    /// `instanceUuid` of the VM the DVS port is plugged into.
    pub actual_device_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SegmentMismatch {
    pub device_ref: DeviceRef,
    pub device_identity: String,
    /// Expected from Neutron but not attached on the DVS.
    pub missing_segments: Vec<String>,
    /// Attached on the DVS but not expected from Neutron.
    pub extra_segments: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortMappingDiff {
    pub authoritative_only: BTreeSet<String>,
    pub reference_only: BTreeSet<String>,
    /// In-scope DVS ports with a blank name; they can never correlate.
    pub unnamed_authoritative: usize,
}

impl PortMappingDiff {
    pub fn is_clean(&self) -> bool {
        self.authoritative_only.is_empty() && self.reference_only.is_empty()
    }
}

/// Data-integrity finding: a record references something its side does not have.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnresolvedReference {
    /// A DVS port's portgroup key is absent from the segment table.
    Segment {
        port: PortHandle,
        segment_key: SegmentKey,
    },
    /// A DVS port's connectee VM is absent from the device table.
    Device { port: PortHandle, device_ref: DeviceRef },
    /// A VM's network key is absent from the segment table.
    DeviceSegment {
        device_ref: DeviceRef,
        segment_key: SegmentKey,
    },
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Segment { port, segment_key } => write!(
                f,
                "DVS port key {port} references unknown portgroup key {segment_key}"
            ),
            Self::Device { port, device_ref } => write!(
                f,
                "DVS port key {port} is connected to unknown VM ref {device_ref}"
            ),
            Self::DeviceSegment {
                device_ref,
                segment_key,
            } => write!(
                f,
                "VM ref {device_ref} is attached to unknown portgroup key {segment_key}"
            ),
        }
    }
}

impl std::error::Error for UnresolvedReference {}
