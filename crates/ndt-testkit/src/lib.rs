//! Test support for ndt: snapshot fixtures and an instrumented DVS sink.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ndt_reconcile::snapshot_adapter::{DvsInventory, NeutronInventory};

mod fixtures;
mod recording;

pub use fixtures::{NeutronFixture, SwitchFixture};
pub use recording::{RecordedOp, RecordingDvs};

pub fn load_dvs_snapshot_json(path: &Path) -> Result<DvsInventory> {
    let s = fs::read_to_string(path)
        .with_context(|| format!("read dvs snapshot: {}", path.display()))?;
    DvsInventory::from_json(&s).context("parse dvs snapshot json")
}

pub fn load_neutron_snapshot_json(path: &Path) -> Result<NeutronInventory> {
    let s = fs::read_to_string(path)
        .with_context(|| format!("read neutron snapshot: {}", path.display()))?;
    NeutronInventory::from_json(&s).context("parse neutron snapshot json")
}

/// Both snapshots written to a temp dir, for driving the `ndt` binary.
/// The directory is removed on drop.
pub struct SnapshotFiles {
    _dir: tempfile::TempDir,
    pub dvs: PathBuf,
    pub neutron: PathBuf,
}

pub fn write_snapshot_files(
    dvs: &SwitchFixture,
    neutron: &NeutronFixture,
) -> Result<SnapshotFiles> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let dvs_path = dir.path().join("dvs.json");
    let neutron_path = dir.path().join("neutron.json");

    fs::write(&dvs_path, serde_json::to_string_pretty(dvs.snapshot())?)
        .context("write dvs snapshot")?;
    fs::write(&neutron_path, serde_json::to_string_pretty(neutron.snapshot())?)
        .context("write neutron snapshot")?;

    Ok(SnapshotFiles {
        _dir: dir,
        dvs: dvs_path,
        neutron: neutron_path,
    })
}
