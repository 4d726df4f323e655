//! Staged, human-readable report output.
//!
//! Every stage starts with a timestamped heading and ends with a `Result:`
//! line, even when there is nothing to report, so an empty stage can never be
//! mistaken for a crash.

use std::io::{self, Write};

use chrono::Local;

use crate::executor::{AlignReport, CorrectiveOp, OperationFailure, OperationOutcome};
use crate::{
    CheckReport, ConnectivityMismatch, DuplicateNameFinding, PortMappingDiff, PortRecord,
    SegmentMismatch, UnresolvedReference,
};

pub const STAGE_DUPLICATES: &str = "DVS port name duplications";
pub const STAGE_CONNECTIVITY: &str = "Connectee (device ID) consistency";
pub const STAGE_SEGMENTS: &str = "VM portgroup consistency with OS port security group";
pub const STAGE_PORT_MAPPING: &str = "Port mapping";
pub const STAGE_UNRESOLVED: &str = "Unresolved references";
pub const STAGE_EXACT: &str = "Exact matches";
pub const STAGE_RENAME: &str = "Renaming misnamed DVS ports";
pub const STAGE_MOVE: &str = "Moving misplaced DVS ports";
pub const STAGE_DISCONNECT: &str = "Disconnecting misconnected DVS ports";
pub const STAGE_CLEAR_NAMES: &str = "Clearing orphaned DVS port names";
pub const STAGE_UNMATCHED: &str = "Remaining unmatched ports";

type Clock = Box<dyn Fn() -> String>;

/// `ctime(3)`-style local timestamp, e.g. `Mon Oct 19 14:03:07 2026`.
pub fn ctime_now() -> String {
    Local::now().format("%a %b %e %H:%M:%S %Y").to_string()
}

pub struct Reporter<W: Write> {
    out: W,
    clock: Clock,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self::with_clock(out, ctime_now)
    }

    pub fn with_clock(out: W, clock: impl Fn() -> String + 'static) -> Self {
        Self {
            out,
            clock: Box::new(clock),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn stage(&mut self, heading: &str) -> io::Result<()> {
        let line = format!("{heading} (started at {})", (self.clock)());
        writeln!(self.out, "\n\n{line}")?;
        writeln!(self.out, "{}", "-".repeat(line.chars().count()))
    }

    fn verdict(&mut self, failures: usize, what: &str) -> io::Result<()> {
        if failures == 0 {
            writeln!(self.out, "Result: PASS")
        } else {
            writeln!(self.out, "Result: FAIL ({failures} {what})")
        }
    }

    // -----------------------------------------------------------------------
    // Checks
    // -----------------------------------------------------------------------

    pub fn duplicates(&mut self, findings: &[DuplicateNameFinding]) -> io::Result<()> {
        self.stage(STAGE_DUPLICATES)?;
        for f in findings {
            writeln!(self.out, "Multiple ports named {}:", f.name)?;
            for m in &f.members {
                writeln!(
                    self.out,
                    "  Port key: {}, PG key: {}, Connected: {}",
                    m.backing, m.segment_key, m.connected
                )?;
            }
        }
        if findings.is_empty() {
            writeln!(self.out, "No vSphere ports with duplicate names.")?;
        }
        self.verdict(findings.len(), "duplicated name(s)")
    }

    pub fn connectivity(&mut self, mismatches: &[ConnectivityMismatch]) -> io::Result<()> {
        self.stage(STAGE_CONNECTIVITY)?;
        for m in mismatches {
            writeln!(
                self.out,
                "Inconsistent connectees for port {}: VC VM instanceUuid ({}) != OS port device_id ({})",
                m.port_id,
                or_none(m.actual_device_id.as_deref()),
                or_none(m.expected_device_id.as_deref()),
            )?;
        }
        if mismatches.is_empty() {
            writeln!(
                self.out,
                "No inconsistencies between VC ports connectee instanceUuid and OS ports device_id."
            )?;
        }
        self.verdict(mismatches.len(), "inconsistent connectee(s)")
    }

    pub fn segments(&mut self, mismatches: &[SegmentMismatch]) -> io::Result<()> {
        self.stage(STAGE_SEGMENTS)?;
        for m in mismatches {
            writeln!(
                self.out,
                "Inconsistent portgroups for VM ref {} (device_id/instanceUuid {}):",
                m.device_ref, m.device_identity
            )?;
            if !m.missing_segments.is_empty() {
                writeln!(self.out, "  Expected but missing connection to PGs:")?;
                for name in &m.missing_segments {
                    writeln!(self.out, "    {name}")?;
                }
            }
            if !m.extra_segments.is_empty() {
                writeln!(self.out, "  Unexpected but present connection to PGs:")?;
                for name in &m.extra_segments {
                    writeln!(self.out, "    {name}")?;
                }
            }
        }
        if mismatches.is_empty() {
            writeln!(
                self.out,
                "No inconsistencies between VC VM portgroup connections and OS ports security groups."
            )?;
        }
        self.verdict(mismatches.len(), "inconsistent VM(s)")
    }

    pub fn port_mapping(&mut self, diff: &PortMappingDiff) -> io::Result<()> {
        self.stage(STAGE_PORT_MAPPING)?;
        writeln!(self.out, "vSphere-only ports:")?;
        for id in &diff.authoritative_only {
            writeln!(self.out, "  {id}")?;
        }
        writeln!(self.out, "OpenStack-only ports:")?;
        for id in &diff.reference_only {
            writeln!(self.out, "  {id}")?;
        }
        if diff.unnamed_authoritative > 0 {
            writeln!(
                self.out,
                "Unnamed in-scope vSphere ports: {}",
                diff.unnamed_authoritative
            )?;
        }
        self.verdict(
            diff.authoritative_only.len() + diff.reference_only.len(),
            "unmapped port(s)",
        )
    }

    pub fn unresolved(&mut self, refs: &[UnresolvedReference]) -> io::Result<()> {
        self.stage(STAGE_UNRESOLVED)?;
        for r in refs {
            writeln!(self.out, "[INTEGRITY] {r}")?;
        }
        if refs.is_empty() {
            writeln!(self.out, "All port, VM and portgroup references resolved.")?;
        }
        self.verdict(refs.len(), "unresolved reference(s)")
    }

    /// All check stages, in a fixed order.
    pub fn check_report(&mut self, report: &CheckReport) -> io::Result<()> {
        self.duplicates(&report.duplicates)?;
        self.connectivity(&report.connectivity)?;
        self.segments(&report.segments)?;
        self.port_mapping(&report.mapping)?;
        self.unresolved(&report.unresolved)
    }

    // -----------------------------------------------------------------------
    // Executor
    // -----------------------------------------------------------------------

    fn outcomes(&mut self, outcomes: &[OperationOutcome], nothing: &str) -> io::Result<()> {
        for o in outcomes {
            writeln!(self.out, "{}", describe(o))?;
        }
        if outcomes.is_empty() {
            writeln!(self.out, "{nothing}")?;
        }
        let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
        self.verdict(failed, "failed operation(s)")
    }

    pub fn align_report(&mut self, report: &AlignReport) -> io::Result<()> {
        self.stage(STAGE_EXACT)?;
        writeln!(
            self.out,
            "{} port(s) already consistent between DVS and OpenStack.",
            report.exact_matches.len()
        )?;
        self.verdict(0, "")?;

        self.stage(STAGE_RENAME)?;
        self.outcomes(&report.renames, "No misnamed DVS ports.")?;

        self.stage(STAGE_MOVE)?;
        self.outcomes(&report.moves, "No misplaced DVS ports.")?;

        self.stage(STAGE_DISCONNECT)?;
        for rec in &report.misconnected {
            writeln!(
                self.out,
                "Misconnected DVS port with key {} (VM instanceUuid = {}).",
                rec.backing,
                or_none(rec.device_id.as_deref())
            )?;
        }
        if report.misconnected.is_empty() {
            self.outcomes(&report.disconnects, "No misconnected DVS ports.")?;
        } else {
            self.verdict(report.misconnected.len(), "misconnected port(s) left in place")?;
        }

        self.stage(STAGE_CLEAR_NAMES)?;
        self.outcomes(&report.cleared_names, "No orphaned DVS port names cleared.")?;

        self.stage(STAGE_UNMATCHED)?;
        for rec in &report.unmatched_dvs {
            writeln!(self.out, "Unreconciled DVS port: {}", describe_record(rec))?;
        }
        for rec in &report.unmatched_neutron {
            writeln!(self.out, "Unmatched OpenStack port: {}", describe_record(rec))?;
        }
        if report.unmatched_dvs.is_empty() && report.unmatched_neutron.is_empty() {
            writeln!(self.out, "No unmatched ports remain.")?;
        }
        writeln!(
            self.out,
            "Operations issued: {}, failed: {}",
            report.operations_issued(),
            report.failures().len()
        )?;
        self.verdict(report.failures().len(), "failed operation(s)")
    }
}

fn or_none(v: Option<&str>) -> &str {
    v.unwrap_or("None")
}

fn describe_record(rec: &PortRecord) -> String {
    format!(
        "ID = {}, target PG name = {}, device ID = {}, handle = {}.",
        rec.port_id,
        rec.segment_name,
        or_none(rec.device_id.as_deref()),
        rec.backing
    )
}

fn describe(o: &OperationOutcome) -> String {
    match (&o.op, &o.result) {
        (CorrectiveOp::Rename { from, to, .. }, Ok(())) => {
            format!("Renamed DVS port from {from} to {to}.")
        }
        (
            CorrectiveOp::Move {
                port_id,
                from_segment,
                to_segment,
                ..
            },
            Ok(()),
        ) => format!("Moved DVS port {port_id} from portgroup {from_segment} to {to_segment}."),
        (
            CorrectiveOp::Move {
                port_id,
                to_segment,
                ..
            },
            Err(OperationFailure::SegmentNotFound { .. }),
        ) => format!(
            "[ERROR] Could not move DVS port {port_id} to portgroup {to_segment} \
             since no portgroup found with that name."
        ),
        (
            CorrectiveOp::Disconnect {
                port_id, device_id, ..
            },
            Ok(()),
        ) => format!("Disconnected DVS port {port_id} (VM instanceUuid = {device_id})."),
        (CorrectiveOp::ClearName { name, .. }, Ok(())) => {
            format!("Renamed orphaned DVS port {name} to blank.")
        }
        (op, Err(e)) => format!("[ERROR] Failed to {op}. Exception: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::OperationError;
    use crate::{DuplicateMember, PortHandle, SegmentKey};

    fn render(f: impl FnOnce(&mut Reporter<Vec<u8>>) -> io::Result<()>) -> String {
        let mut r = Reporter::with_clock(Vec::new(), || "Mon Oct 19 14:03:07 2026".to_string());
        f(&mut r).unwrap();
        String::from_utf8(r.into_inner()).unwrap()
    }

    #[test]
    fn stage_heading_is_timestamped_and_underlined() {
        let out = render(|r| r.stage("Port mapping"));
        let heading = "Port mapping (started at Mon Oct 19 14:03:07 2026)";
        assert_eq!(out, format!("\n\n{heading}\n{}\n", "-".repeat(heading.len())));
    }

    #[test]
    fn empty_check_still_prints_pass() {
        let out = render(|r| r.duplicates(&[]));
        assert!(out.contains("No vSphere ports with duplicate names."));
        assert!(out.trim_end().ends_with("Result: PASS"));
    }

    #[test]
    fn duplicate_finding_prints_fail() {
        let finding = DuplicateNameFinding {
            name: "shared".to_string(),
            members: vec![
                DuplicateMember {
                    backing: PortHandle::new("1"),
                    segment_key: SegmentKey::new("pg-a"),
                    connected: true,
                },
                DuplicateMember {
                    backing: PortHandle::new("2"),
                    segment_key: SegmentKey::new("pg-a"),
                    connected: false,
                },
            ],
        };
        let out = render(|r| r.duplicates(&[finding]));
        assert!(out.contains("Multiple ports named shared:"));
        assert!(out.contains("Port key: 2, PG key: pg-a, Connected: false"));
        assert!(out.contains("Result: FAIL (1 duplicated name(s))"));
    }

    #[test]
    fn connectivity_renders_missing_binding_as_none() {
        let out = render(|r| {
            r.connectivity(&[ConnectivityMismatch {
                port_id: "p1".to_string(),
                expected_device_id: Some("d1".to_string()),
                actual_device_id: None,
            }])
        });
        assert!(out.contains("VC VM instanceUuid (None) != OS port device_id (d1)"));
    }

    #[test]
    fn failed_operation_is_rendered_with_platform_error() {
        let outcome = OperationOutcome {
            op: CorrectiveOp::Rename {
                port: PortHandle::new("10"),
                from: "old".to_string(),
                to: "p1".to_string(),
            },
            result: Err(OperationFailure::Platform(OperationError::new("port is locked"))),
        };
        assert_eq!(
            describe(&outcome),
            "[ERROR] Failed to rename DVS port from old to p1. Exception: platform error: port is locked"
        );
    }

    #[test]
    fn empty_align_report_passes_every_stage() {
        let out = render(|r| r.align_report(&AlignReport::default()));
        for stage in [
            STAGE_EXACT,
            STAGE_RENAME,
            STAGE_MOVE,
            STAGE_DISCONNECT,
            STAGE_CLEAR_NAMES,
            STAGE_UNMATCHED,
        ] {
            assert!(out.contains(stage), "missing stage {stage}");
        }
        assert!(out.contains("Operations issued: 0, failed: 0"));
        assert!(!out.contains("FAIL"));
    }

    #[test]
    fn every_align_stage_ends_with_a_verdict() {
        let out = render(|r| r.align_report(&AlignReport::default()));
        let exact = out.find(STAGE_EXACT).unwrap();
        let rename = out.find(STAGE_RENAME).unwrap();
        assert!(out[exact..rename].contains("Result: PASS"));
        assert_eq!(out.matches("Result: ").count(), 6);
    }
}
