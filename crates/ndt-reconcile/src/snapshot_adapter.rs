//! Snapshot adapter: offline inventory exports as in-memory inventories.
//!
//! # Purpose
//! Both platforms can be exported to JSON. This module defines the document
//! shapes of those exports, validates them, and wraps them in
//! [`DvsInventory`] / [`NeutronInventory`], which implement the collaborator
//! traits in [`crate::source`]. `DvsInventory` is also a [`DvsSink`]: applied
//! operations change the in-memory switch, which can be written back out.
//!
//! # Design constraints
//! - No network IO; callers read and write the files.
//! - Validation errors are surfaced as [`SnapshotAdapterError`].
//! - Unknown fields are ignored so newer exports keep loading.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::source::{DvsSink, DvsSource, NeutronSource, OperationError, SourceError};
use crate::{
    ConnecteeKind, DeviceRef, PortHandle, PortScope, RawDevice, RawDvsPort, RawNeutronPort,
    Segment, SegmentKey,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotAdapterError {
    /// The document is not valid JSON for its shape.
    Json(String),
    /// DVS export has an empty `uuid`.
    MissingSwitchUuid,
    /// A DVS port has an empty `key`.
    MissingPortKey,
    DuplicatePortKey { key: String },
    /// A portgroup has an empty `key`.
    MissingPortgroupKey,
    DuplicatePortgroupKey { key: String },
    /// A VM has an empty `vm_ref`.
    MissingVmRef,
    MissingInstanceUuid { vm_ref: String },
    /// A Neutron port has an empty `id`.
    MissingNeutronPortId,
    MissingNetworkId { port_id: String },
}

impl fmt::Display for SnapshotAdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "snapshot is not valid json: {msg}"),
            Self::MissingSwitchUuid => write!(f, "DVS snapshot has empty uuid"),
            Self::MissingPortKey => write!(f, "DVS port has empty key"),
            Self::DuplicatePortKey { key } => write!(f, "DVS port key '{key}' appears twice"),
            Self::MissingPortgroupKey => write!(f, "portgroup has empty key"),
            Self::DuplicatePortgroupKey { key } => {
                write!(f, "portgroup key '{key}' appears twice")
            }
            Self::MissingVmRef => write!(f, "VM has empty vm_ref"),
            Self::MissingInstanceUuid { vm_ref } => {
                write!(f, "VM '{vm_ref}' has empty instance_uuid")
            }
            Self::MissingNeutronPortId => write!(f, "Neutron port has empty id"),
            Self::MissingNetworkId { port_id } => {
                write!(f, "Neutron port '{port_id}' has empty network_id")
            }
        }
    }
}

impl std::error::Error for SnapshotAdapterError {}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// DVS export: switch identity, portgroups, VMs and ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvsSnapshot {
    pub uuid: String,
    #[serde(default)]
    pub portgroups: Vec<Segment>,
    #[serde(default)]
    pub vms: Vec<RawDevice>,
    #[serde(default)]
    pub ports: Vec<RawDvsPort>,
}

/// Neutron export: ports only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeutronSnapshot {
    #[serde(default)]
    pub ports: Vec<RawNeutronPort>,
}

fn validate_dvs(snap: &DvsSnapshot) -> Result<(), SnapshotAdapterError> {
    if snap.uuid.trim().is_empty() {
        return Err(SnapshotAdapterError::MissingSwitchUuid);
    }

    let mut pg_keys = BTreeSet::new();
    for pg in &snap.portgroups {
        if pg.key.as_str().trim().is_empty() {
            return Err(SnapshotAdapterError::MissingPortgroupKey);
        }
        if !pg_keys.insert(pg.key.as_str()) {
            return Err(SnapshotAdapterError::DuplicatePortgroupKey {
                key: pg.key.to_string(),
            });
        }
    }

    for vm in &snap.vms {
        if vm.vm_ref.as_str().trim().is_empty() {
            return Err(SnapshotAdapterError::MissingVmRef);
        }
        if vm.instance_uuid.trim().is_empty() {
            return Err(SnapshotAdapterError::MissingInstanceUuid {
                vm_ref: vm.vm_ref.to_string(),
            });
        }
    }

    let mut port_keys = BTreeSet::new();
    for p in &snap.ports {
        if p.key.as_str().trim().is_empty() {
            return Err(SnapshotAdapterError::MissingPortKey);
        }
        if !port_keys.insert(p.key.as_str()) {
            return Err(SnapshotAdapterError::DuplicatePortKey {
                key: p.key.to_string(),
            });
        }
    }

    // Dangling portgroup and VM references are left to the normalizer.
    Ok(())
}

fn validate_neutron(snap: &NeutronSnapshot) -> Result<(), SnapshotAdapterError> {
    for p in &snap.ports {
        if p.id.trim().is_empty() {
            return Err(SnapshotAdapterError::MissingNeutronPortId);
        }
        if p.network_id.trim().is_empty() {
            return Err(SnapshotAdapterError::MissingNetworkId {
                port_id: p.id.clone(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// DVS
// ---------------------------------------------------------------------------

/// In-memory switch built from a [`DvsSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvsInventory {
    snapshot: DvsSnapshot,
}

impl DvsInventory {
    pub fn from_snapshot(snapshot: DvsSnapshot) -> Result<Self, SnapshotAdapterError> {
        validate_dvs(&snapshot)?;
        Ok(Self { snapshot })
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotAdapterError> {
        let snapshot: DvsSnapshot =
            serde_json::from_str(json).map_err(|e| SnapshotAdapterError::Json(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotAdapterError> {
        serde_json::to_string_pretty(&self.snapshot)
            .map_err(|e| SnapshotAdapterError::Json(e.to_string()))
    }

    pub fn uuid(&self) -> &str {
        &self.snapshot.uuid
    }

    pub fn snapshot(&self) -> &DvsSnapshot {
        &self.snapshot
    }

    pub fn port(&self, key: &PortHandle) -> Option<&RawDvsPort> {
        self.snapshot.ports.iter().find(|p| &p.key == key)
    }

    pub fn vm(&self, vm_ref: &DeviceRef) -> Option<&RawDevice> {
        self.snapshot.vms.iter().find(|v| &v.vm_ref == vm_ref)
    }

    fn port_mut(&mut self, key: &PortHandle) -> Result<&mut RawDvsPort, OperationError> {
        self.snapshot
            .ports
            .iter_mut()
            .find(|p| &p.key == key)
            .ok_or_else(|| OperationError::new(format!("DVS port key {key} not found")))
    }

    /// Keep a VM's network list in step after one of its ports left `old` or
    /// joined `new`.
    fn refresh_vm_networks(
        &mut self,
        vm_ref: &DeviceRef,
        old: &SegmentKey,
        new: Option<&SegmentKey>,
    ) {
        let still_in_old = self
            .snapshot
            .ports
            .iter()
            .any(|p| p.connected_vm() == Some(vm_ref) && &p.portgroup_key == old);

        if let Some(vm) = self.snapshot.vms.iter_mut().find(|v| &v.vm_ref == vm_ref) {
            if !still_in_old {
                vm.networks.retain(|k| k != old);
            }
            if let Some(new) = new {
                if !vm.networks.contains(new) {
                    vm.networks.push(new.clone());
                }
            }
        }
    }
}

impl DvsSource for DvsInventory {
    fn list_ports(&self, scope: &PortScope) -> Result<Vec<RawDvsPort>, SourceError> {
        Ok(scope.filter(self.snapshot.ports.iter().cloned()))
    }

    fn list_devices(&self) -> Result<Vec<RawDevice>, SourceError> {
        Ok(self.snapshot.vms.clone())
    }

    fn list_segments(&self) -> Result<Vec<Segment>, SourceError> {
        Ok(self.snapshot.portgroups.clone())
    }
}

impl DvsSink for DvsInventory {
    fn rename(&mut self, port: &PortHandle, new_name: &str) -> Result<(), OperationError> {
        let p = self.port_mut(port)?;
        p.name = (!new_name.is_empty()).then(|| new_name.to_string());
        Ok(())
    }

    fn move_port(
        &mut self,
        port: &PortHandle,
        destination: &SegmentKey,
    ) -> Result<(), OperationError> {
        if !self.snapshot.portgroups.iter().any(|pg| &pg.key == destination) {
            return Err(OperationError::new(format!(
                "portgroup key {destination} not found"
            )));
        }

        let p = self.port_mut(port)?;
        let old = std::mem::replace(&mut p.portgroup_key, destination.clone());
        let vm_ref = p.connected_vm().cloned();

        if let Some(vm_ref) = vm_ref {
            self.refresh_vm_networks(&vm_ref, &old, Some(destination));
        }
        Ok(())
    }

    fn disconnect(&mut self, port: &PortHandle) -> Result<(), OperationError> {
        let p = self.port_mut(port)?;
        let Some(connectee) = p.connectee.as_ref() else {
            return Ok(());
        };
        if connectee.kind != ConnecteeKind::VmVnic {
            return Err(OperationError::new(format!(
                "DVS port key {port} is not connected to a VM adapter"
            )));
        }

        let vm_ref = connectee.entity.clone();
        let pg = p.portgroup_key.clone();
        p.connectee = None;
        self.refresh_vm_networks(&vm_ref, &pg, None);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Neutron
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeutronInventory {
    ports: Vec<RawNeutronPort>,
}

impl NeutronInventory {
    pub fn from_snapshot(snapshot: NeutronSnapshot) -> Result<Self, SnapshotAdapterError> {
        validate_neutron(&snapshot)?;
        Ok(Self {
            ports: snapshot.ports,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotAdapterError> {
        let snapshot: NeutronSnapshot =
            serde_json::from_str(json).map_err(|e| SnapshotAdapterError::Json(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }
}

impl NeutronSource for NeutronInventory {
    fn list_ports(&self, host: Option<&str>) -> Result<Vec<RawNeutronPort>, SourceError> {
        Ok(self
            .ports
            .iter()
            .filter(|p| match host {
                Some(h) => p.binding_host_id.as_deref() == Some(h),
                None => true,
            })
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DVS_JSON: &str = r#"{
        "uuid": "AB CD-EF-12-34",
        "portgroups": [
            { "key": "pg-a", "name": "seg-A" },
            { "key": "pg-b", "name": "seg-B" }
        ],
        "vms": [
            { "vm_ref": "vm-1", "instance_uuid": "d1", "networks": ["pg-a"] }
        ],
        "ports": [
            {
                "key": "10",
                "name": "p1",
                "portgroup_key": "pg-a",
                "connectee": { "kind": "vm_vnic", "entity": "vm-1", "nic_key": 4000 }
            },
            { "key": "11", "portgroup_key": "pg-a" },
            {
                "key": "12",
                "name": "uplink1",
                "portgroup_key": "pg-a",
                "connectee": { "kind": "uplink", "entity": "host-7" }
            }
        ]
    }"#;

    fn inventory() -> DvsInventory {
        DvsInventory::from_json(DVS_JSON).unwrap()
    }

    #[test]
    fn list_ports_applies_scope() {
        let ports = inventory().list_ports(&PortScope).unwrap();
        let keys: Vec<&str> = ports.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["10"]);
    }

    #[test]
    fn duplicate_port_key_is_rejected() {
        let mut snap: DvsSnapshot = serde_json::from_str(DVS_JSON).unwrap();
        snap.ports.push(snap.ports[0].clone());
        assert_eq!(
            DvsInventory::from_snapshot(snap),
            Err(SnapshotAdapterError::DuplicatePortKey {
                key: "10".to_string()
            })
        );
    }

    #[test]
    fn empty_uuid_is_rejected() {
        let mut snap: DvsSnapshot = serde_json::from_str(DVS_JSON).unwrap();
        snap.uuid = " ".to_string();
        assert_eq!(
            DvsInventory::from_snapshot(snap),
            Err(SnapshotAdapterError::MissingSwitchUuid)
        );
    }

    #[test]
    fn bad_json_is_reported() {
        assert!(matches!(
            DvsInventory::from_json("{"),
            Err(SnapshotAdapterError::Json(_))
        ));
    }

    #[test]
    fn rename_to_blank_unnames_port() {
        let mut inv = inventory();
        inv.rename(&PortHandle::new("10"), "").unwrap();
        assert_eq!(inv.port(&PortHandle::new("10")).unwrap().name, None);
    }

    #[test]
    fn rename_unknown_port_fails() {
        let mut inv = inventory();
        assert!(inv.rename(&PortHandle::new("99"), "x").is_err());
    }

    #[test]
    fn move_updates_port_and_vm_networks() {
        let mut inv = inventory();
        inv.move_port(&PortHandle::new("10"), &SegmentKey::new("pg-b"))
            .unwrap();
        assert_eq!(
            inv.port(&PortHandle::new("10")).unwrap().portgroup_key,
            SegmentKey::new("pg-b")
        );
        assert_eq!(
            inv.vm(&DeviceRef::new("vm-1")).unwrap().networks,
            vec![SegmentKey::new("pg-b")]
        );
    }

    #[test]
    fn move_to_unknown_portgroup_fails() {
        let mut inv = inventory();
        let err = inv
            .move_port(&PortHandle::new("10"), &SegmentKey::new("pg-z"))
            .unwrap_err();
        assert!(err.message.contains("pg-z"));
    }

    #[test]
    fn disconnect_detaches_vm_and_is_idempotent() {
        let mut inv = inventory();
        inv.disconnect(&PortHandle::new("10")).unwrap();
        assert!(inv.port(&PortHandle::new("10")).unwrap().connectee.is_none());
        assert!(inv.vm(&DeviceRef::new("vm-1")).unwrap().networks.is_empty());
        inv.disconnect(&PortHandle::new("10")).unwrap();
    }

    #[test]
    fn disconnect_refuses_uplinks() {
        let mut inv = inventory();
        assert!(inv.disconnect(&PortHandle::new("12")).is_err());
    }

    #[test]
    fn json_written_back_reloads() {
        let mut inv = inventory();
        inv.rename(&PortHandle::new("10"), "p9").unwrap();
        let reloaded = DvsInventory::from_json(&inv.to_json_pretty().unwrap()).unwrap();
        assert_eq!(reloaded, inv);
    }

    #[test]
    fn neutron_host_filter() {
        let inv = NeutronInventory::from_json(
            r#"{ "ports": [
                { "id": "p1", "device_id": "d1", "network_id": "n1", "binding_host_id": "esx-1" },
                { "id": "p2", "device_id": "d2", "network_id": "n1", "binding_host_id": "esx-2" },
                { "id": "p3", "network_id": "n1" }
            ] }"#,
        )
        .unwrap();
        assert_eq!(inv.list_ports(None).unwrap().len(), 3);
        let on_host = inv.list_ports(Some("esx-1")).unwrap();
        assert_eq!(on_host.len(), 1);
        assert_eq!(on_host[0].id, "p1");
    }

    #[test]
    fn neutron_port_without_network_is_rejected() {
        assert_eq!(
            NeutronInventory::from_json(r#"{ "ports": [ { "id": "p1", "network_id": "" } ] }"#),
            Err(SnapshotAdapterError::MissingNetworkId {
                port_id: "p1".to_string()
            })
        );
    }
}
