//! Command handler modules for ndt.
//!
//! Shared loading and settings resolution live here.
//! Command-specific logic lives in the submodules.

pub mod align;
pub mod report;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use ndt_config::{report_unused_keys, ConfigMode, RunSettings};
use ndt_reconcile::snapshot_adapter::{DvsInventory, NeutronInventory};
use ndt_reconcile::{collect, Inventory};

/// Inputs shared by `report` and `align`.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Layered config paths in merge order
    #[arg(long = "config")]
    pub config_paths: Vec<String>,

    /// DVS snapshot (JSON export)
    #[arg(long)]
    pub dvs: PathBuf,

    /// Neutron snapshot (JSON export)
    #[arg(long)]
    pub neutron: PathBuf,

    /// Switch identity for portgroup names (overrides dvs.uuid)
    #[arg(long = "dvs-uuid")]
    pub dvs_uuid: Option<String>,

    /// Only Neutron ports bound to this host (overrides neutron.host)
    #[arg(long)]
    pub host: Option<String>,
}

pub struct Prepared {
    pub dvs: DvsInventory,
    pub neutron: NeutronInventory,
    pub settings: RunSettings,
    pub config_hash: Option<String>,
}

impl Prepared {
    pub fn collect(&self) -> Result<Inventory> {
        collect(
            &self.dvs,
            &self.neutron,
            &self.settings.dvs_uuid,
            self.settings.neutron_host.as_deref(),
        )
        .context("inventory collection failed")
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub fn load_dvs(path: &Path) -> Result<DvsInventory> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read dvs snapshot failed: {}", path.display()))?;
    DvsInventory::from_json(&raw)
        .with_context(|| format!("invalid dvs snapshot: {}", path.display()))
}

pub fn load_neutron(path: &Path) -> Result<NeutronInventory> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read neutron snapshot failed: {}", path.display()))?;
    NeutronInventory::from_json(&raw)
        .with_context(|| format!("invalid neutron snapshot: {}", path.display()))
}

/// Load both snapshots and resolve the run settings for `mode`.
///
/// Without `--config` the switch identity comes from `--dvs-uuid` or, failing
/// that, the DVS snapshot itself.
pub fn prepare(mode: ConfigMode, args: &SourceArgs) -> Result<Prepared> {
    let dvs = load_dvs(&args.dvs)?;
    let neutron = load_neutron(&args.neutron)?;

    let (mut settings, config_hash) = if args.config_paths.is_empty() {
        let uuid = args
            .dvs_uuid
            .clone()
            .unwrap_or_else(|| dvs.uuid().to_string());
        (RunSettings::for_switch(uuid), None)
    } else {
        let loaded = ndt_config::load_layered_yaml(&args.config_paths)?;
        let unused = report_unused_keys(
            mode,
            &loaded.config_json,
            mode.default_unused_key_policy(),
        )?;
        for ptr in &unused.unused_leaf_pointers {
            tracing::warn!(mode = %unused.mode, pointer = %ptr, "unused config key");
        }

        let mut cfg = loaded.config_json;
        if let Some(uuid) = &args.dvs_uuid {
            override_leaf(&mut cfg, "dvs", "uuid", uuid);
        }
        (
            RunSettings::from_config_json(&cfg)?,
            Some(loaded.config_hash),
        )
    };

    if let Some(host) = &args.host {
        settings.neutron_host = Some(host.clone());
    }

    if settings.dvs_uuid != dvs.uuid() {
        tracing::warn!(
            configured = %settings.dvs_uuid,
            snapshot = %dvs.uuid(),
            "switch identity differs from the DVS snapshot"
        );
    }

    Ok(Prepared {
        dvs,
        neutron,
        settings,
        config_hash,
    })
}

fn override_leaf(cfg: &mut Value, section: &str, key: &str, value: &str) {
    if let Value::Object(root) = cfg {
        let entry = root
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
        if !entry.is_object() {
            *entry = Value::Object(Default::default());
        }
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
}

/// `key=value` lines ahead of the staged report.
pub fn print_run_header(out: &mut impl Write, p: &Prepared) -> Result<()> {
    writeln!(out, "dvs_uuid={}", p.settings.dvs_uuid)?;
    writeln!(
        out,
        "neutron_host={}",
        p.settings.neutron_host.as_deref().unwrap_or("ALL")
    )?;
    writeln!(
        out,
        "config_hash={}",
        p.config_hash.as_deref().unwrap_or("NONE")
    )?;
    Ok(())
}
