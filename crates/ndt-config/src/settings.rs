use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use ndt_reconcile::{AlignOptions, DisconnectPolicy};

/// Typed view of the keys a run reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Switch identity fed to the portgroup name deriver.
    pub dvs_uuid: String,
    /// Restrict Neutron ports to those bound to this host.
    pub neutron_host: Option<String>,
    pub align: AlignOptions,
}

impl RunSettings {
    /// Settings for a run with no config file.
    pub fn for_switch(dvs_uuid: impl Into<String>) -> Self {
        Self {
            dvs_uuid: dvs_uuid.into(),
            neutron_host: None,
            align: AlignOptions::default(),
        }
    }

    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let dvs_uuid = cfg
            .pointer("/dvs/uuid")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .context("config missing dvs.uuid")?;

        let neutron_host = match cfg.pointer("/neutron/host") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(other) => return Err(anyhow!("neutron.host must be a string (got {other})")),
        };

        let disconnect_policy = match cfg.pointer("/align/disconnect_policy") {
            None | Some(Value::Null) => DisconnectPolicy::default(),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "disconnect" => DisconnectPolicy::Disconnect,
                "report_only" => DisconnectPolicy::ReportOnly,
                other => {
                    return Err(anyhow!(
                        "align.disconnect_policy must be 'disconnect' or 'report_only' (got '{other}')"
                    ))
                }
            },
            Some(other) => {
                return Err(anyhow!(
                    "align.disconnect_policy must be a string (got {other})"
                ))
            }
        };

        let clear_orphan_names = match cfg.pointer("/align/clear_orphan_names") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(anyhow!(
                    "align.clear_orphan_names must be a bool (got {other})"
                ))
            }
        };

        Ok(Self {
            dvs_uuid: dvs_uuid.to_string(),
            neutron_host,
            align: AlignOptions {
                disconnect_policy,
                clear_orphan_names,
            },
        })
    }
}
