use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use uuid::Uuid;

use ndt_config::ConfigMode;
use ndt_reconcile::report::Reporter;
use ndt_reconcile::{align, check, AlignAuthorization};

use super::{prepare, print_run_header, SourceArgs};

/// `ndt align`: checks, then the corrective passes against the DVS snapshot.
pub fn run(args: &SourceArgs, yes: bool, out_path: Option<&Path>) -> Result<()> {
    let Ok(authorization) = AlignAuthorization::from_confirmation(yes) else {
        bail!(
            "ALIGN_NOT_AUTHORIZED: align renames, moves and disconnects DVS ports. \
             Re-run with: `ndt align ... --yes`"
        );
    };

    let mut prepared = prepare(ConfigMode::Align, args)?;
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let span = tracing::info_span!("align", %run_id);
    let _guard = span.enter();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "run_id={run_id}")?;
    writeln!(out, "started_at_utc={}", started_at.to_rfc3339())?;
    print_run_header(&mut out, &prepared)?;

    // Findings are printed before the first DVS change is issued.
    let inv = prepared.collect()?;
    let mut reporter = Reporter::new(out);
    reporter.check_report(&check(&inv))?;
    reporter.flush()?;

    let report = align(
        &mut prepared.dvs,
        &authorization,
        &inv,
        &prepared.settings.align,
    );
    reporter.align_report(&report)?;
    reporter.into_inner().flush()?;

    if let Some(path) = out_path {
        let json = prepared.dvs.to_json_pretty()?;
        fs::write(path, json)
            .with_context(|| format!("write converged snapshot failed: {}", path.display()))?;
        tracing::info!(path = %path.display(), "converged DVS snapshot written");
    }

    let failures = report.failures().len();
    if failures > 0 {
        bail!("ALIGN_OPERATIONS_FAILED: {failures} corrective operation(s) failed");
    }
    Ok(())
}
