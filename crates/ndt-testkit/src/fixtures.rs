//! Builders for small, consistent snapshot pairs.
//!
//! Portgroup names are derived with the same function the engine uses, so a
//! fixture that puts a VM port in the portgroup of its Neutron network and
//! security groups is consistent by construction.

use anyhow::Result;
use ndt_reconcile::snapshot_adapter::{
    DvsInventory, DvsSnapshot, NeutronInventory, NeutronSnapshot,
};
use ndt_reconcile::{
    portgroup_name, Connectee, ConnecteeKind, DeviceRef, PortHandle, RawDevice, RawDvsPort,
    RawNeutronPort, Segment, SegmentKey,
};

#[derive(Debug, Clone)]
pub struct SwitchFixture {
    snapshot: DvsSnapshot,
}

impl SwitchFixture {
    pub fn new(uuid: &str) -> Self {
        Self {
            snapshot: DvsSnapshot {
                uuid: uuid.to_string(),
                portgroups: Vec::new(),
                vms: Vec::new(),
                ports: Vec::new(),
            },
        }
    }

    /// Portgroup `key` named after `network_id` + `security_groups`.
    pub fn portgroup(mut self, key: &str, network_id: &str, security_groups: &[&str]) -> Self {
        let name = portgroup_name(&self.snapshot.uuid, network_id, security_groups);
        self.snapshot.portgroups.push(Segment::new(key, name));
        self
    }

    /// Portgroup with a literal name (e.g. one no Neutron network maps to).
    pub fn named_portgroup(mut self, key: &str, name: &str) -> Self {
        self.snapshot.portgroups.push(Segment::new(key, name));
        self
    }

    pub fn vm(mut self, vm_ref: &str, instance_uuid: &str) -> Self {
        self.snapshot.vms.push(RawDevice {
            vm_ref: DeviceRef::new(vm_ref),
            instance_uuid: instance_uuid.to_string(),
            networks: Vec::new(),
        });
        self
    }

    /// Port plugged into `vm_ref`; the VM's network list follows.
    pub fn vm_port(mut self, key: &str, name: &str, pg: &str, vm_ref: &str) -> Self {
        self.snapshot.ports.push(RawDvsPort {
            key: PortHandle::new(key),
            name: (!name.is_empty()).then(|| name.to_string()),
            portgroup_key: SegmentKey::new(pg),
            connectee: Some(Connectee {
                kind: ConnecteeKind::VmVnic,
                entity: DeviceRef::new(vm_ref),
                nic_key: None,
            }),
        });
        let pg = SegmentKey::new(pg);
        if let Some(vm) = self
            .snapshot
            .vms
            .iter_mut()
            .find(|v| v.vm_ref.as_str() == vm_ref)
        {
            if !vm.networks.contains(&pg) {
                vm.networks.push(pg);
            }
        }
        self
    }

    pub fn idle_port(mut self, key: &str, name: &str, pg: &str) -> Self {
        self.snapshot.ports.push(RawDvsPort {
            key: PortHandle::new(key),
            name: (!name.is_empty()).then(|| name.to_string()),
            portgroup_key: SegmentKey::new(pg),
            connectee: None,
        });
        self
    }

    pub fn uplink(mut self, key: &str, name: &str, pg: &str, host: &str) -> Self {
        self.snapshot.ports.push(RawDvsPort {
            key: PortHandle::new(key),
            name: Some(name.to_string()),
            portgroup_key: SegmentKey::new(pg),
            connectee: Some(Connectee {
                kind: ConnecteeKind::Uplink,
                entity: DeviceRef::new(host),
                nic_key: None,
            }),
        });
        self
    }

    pub fn snapshot(&self) -> &DvsSnapshot {
        &self.snapshot
    }

    pub fn build(&self) -> Result<DvsInventory> {
        Ok(DvsInventory::from_snapshot(self.snapshot.clone())?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NeutronFixture {
    snapshot: NeutronSnapshot,
}

impl NeutronFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(
        self,
        id: &str,
        device_id: &str,
        network_id: &str,
        security_groups: &[&str],
    ) -> Self {
        self.push(id, device_id, network_id, security_groups, None)
    }

    pub fn port_on_host(
        self,
        id: &str,
        device_id: &str,
        network_id: &str,
        security_groups: &[&str],
        host: &str,
    ) -> Self {
        self.push(id, device_id, network_id, security_groups, Some(host))
    }

    fn push(
        mut self,
        id: &str,
        device_id: &str,
        network_id: &str,
        security_groups: &[&str],
        host: Option<&str>,
    ) -> Self {
        self.snapshot.ports.push(RawNeutronPort {
            id: id.to_string(),
            device_id: device_id.to_string(),
            network_id: network_id.to_string(),
            security_groups: security_groups.iter().map(|s| s.to_string()).collect(),
            binding_host_id: host.map(str::to_string),
        });
        self
    }

    pub fn snapshot(&self) -> &NeutronSnapshot {
        &self.snapshot
    }

    pub fn build(&self) -> Result<NeutronInventory> {
        Ok(NeutronInventory::from_snapshot(self.snapshot.clone())?)
    }
}
