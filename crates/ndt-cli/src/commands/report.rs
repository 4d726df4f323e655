use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};

use ndt_config::ConfigMode;
use ndt_reconcile::report::Reporter;
use ndt_reconcile::source::DvsSource;
use ndt_reconcile::{check, check_duplicate_names, PortScope};

use super::{load_dvs, prepare, print_run_header, SourceArgs};

/// `ndt report`: every check stage. Findings never change the exit code.
pub fn run(args: &SourceArgs) -> Result<()> {
    let prepared = prepare(ConfigMode::Report, args)?;
    let inv = prepared.collect()?;
    let findings = check(&inv);

    tracing::info!(clean = findings.is_clean(), "checks complete");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    print_run_header(&mut out, &prepared)?;

    let mut reporter = Reporter::new(out);
    reporter.check_report(&findings)?;
    reporter.into_inner().flush()?;
    Ok(())
}

/// `ndt dupes`: the duplicate-name stage on its own.
pub fn run_dupes(dvs: &Path) -> Result<()> {
    let inventory = load_dvs(dvs)?;
    let ports = inventory
        .list_ports(&PortScope)
        .context("listing DVS ports failed")?;
    let findings = check_duplicate_names(&ports);

    let stdout = io::stdout();
    let mut reporter = Reporter::new(stdout.lock());
    reporter.duplicates(&findings)?;
    reporter.into_inner().flush()?;
    Ok(())
}
