use crate::executor::{execute, AlignAuthorization, AlignOptions, AlignReport};
use crate::normalizer::{device_memberships, normalize_dvs_ports_lenient, normalize_neutron_ports};
use crate::source::{DvsSink, DvsSource, NeutronSource, SourceError};
use crate::{
    check_connectivity, check_duplicate_names, check_port_mapping, check_segment_membership,
    ConnectivityMismatch, DeviceTable, DuplicateNameFinding, PortMappingDiff, PortRecord,
    PortScope, RawDevice, RawDvsPort, RawNeutronPort, Segment, SegmentMembership,
    SegmentMismatch, SegmentTable, UnresolvedReference,
};

/// Normalized snapshot of both sides for one run.
///
/// Built once, then only read by the checker and the executor. Re-collect
/// rather than patch it after the DVS has been changed.
#[derive(Clone, Debug)]
pub struct Inventory {
    pub switch_uuid: String,
    /// In-scope DVS ports as received (duplicate detection works on raw names).
    pub scoped_ports: Vec<RawDvsPort>,
    pub segments: SegmentTable,
    pub devices: DeviceTable,
    pub dvs: Vec<PortRecord>,
    pub neutron: Vec<PortRecord>,
    /// Portgroup names each VM is attached to on the DVS.
    pub memberships: Vec<SegmentMembership>,
    pub unresolved: Vec<UnresolvedReference>,
}

impl Inventory {
    pub fn from_raw(
        switch_uuid: &str,
        dvs_ports: Vec<RawDvsPort>,
        segments: Vec<Segment>,
        devices: Vec<RawDevice>,
        neutron_ports: &[RawNeutronPort],
    ) -> Self {
        let scoped_ports = PortScope.filter(dvs_ports);
        let segments = SegmentTable::build(segments);
        let devices = DeviceTable::build(devices);

        let (dvs, mut unresolved) = normalize_dvs_ports_lenient(&scoped_ports, &segments, &devices);
        let (memberships, device_unresolved) = device_memberships(&devices, &segments);
        unresolved.extend(device_unresolved);
        unresolved.sort();

        let neutron = normalize_neutron_ports(switch_uuid, neutron_ports);

        Self {
            switch_uuid: switch_uuid.to_string(),
            scoped_ports,
            segments,
            devices,
            dvs,
            neutron,
            memberships,
            unresolved,
        }
    }
}

/// Read both inventories and normalize them.
///
/// # Errors
/// Any [`SourceError`] aborts collection: a partial view of either side would
/// make every later finding unreliable.
pub fn collect<D, N>(
    dvs: &D,
    neutron: &N,
    switch_uuid: &str,
    host: Option<&str>,
) -> Result<Inventory, SourceError>
where
    D: DvsSource + ?Sized,
    N: NeutronSource + ?Sized,
{
    let ports = dvs.list_ports(&PortScope)?;
    let segments = dvs.list_segments()?;
    let devices = dvs.list_devices()?;
    let neutron_ports = neutron.list_ports(host)?;

    tracing::info!(
        dvs_ports = ports.len(),
        portgroups = segments.len(),
        vms = devices.len(),
        neutron_ports = neutron_ports.len(),
        "inventories collected"
    );

    Ok(Inventory::from_raw(
        switch_uuid,
        ports,
        segments,
        devices,
        &neutron_ports,
    ))
}

/// Findings of all checks. Each field is produced independently.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub duplicates: Vec<DuplicateNameFinding>,
    pub connectivity: Vec<ConnectivityMismatch>,
    pub segments: Vec<SegmentMismatch>,
    pub mapping: PortMappingDiff,
    pub unresolved: Vec<UnresolvedReference>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty()
            && self.connectivity.is_empty()
            && self.segments.is_empty()
            && self.mapping.is_clean()
            && self.unresolved.is_empty()
    }
}

/// Run every check over `inv`. Read-only.
pub fn check(inv: &Inventory) -> CheckReport {
    CheckReport {
        duplicates: check_duplicate_names(&inv.scoped_ports),
        connectivity: check_connectivity(&inv.dvs, &inv.neutron),
        segments: check_segment_membership(&inv.memberships, &inv.neutron),
        mapping: check_port_mapping(&inv.dvs, &inv.neutron),
        unresolved: inv.unresolved.clone(),
    }
}

/// Converge the DVS toward Neutron on working copies of `inv`'s records.
pub fn align<S: DvsSink + ?Sized>(
    sink: &mut S,
    authorization: &AlignAuthorization,
    inv: &Inventory,
    options: &AlignOptions,
) -> AlignReport {
    tracing::info!(
        dvs_records = inv.dvs.len(),
        neutron_records = inv.neutron.len(),
        "aligning DVS ports with Neutron"
    );
    execute(
        sink,
        authorization,
        inv.dvs.clone(),
        inv.neutron.clone(),
        &inv.segments,
        options,
    )
}
