//! Reconciliation executor: converge the DVS toward Neutron.
//!
//! Four ordered passes over working copies of the two record lists. Each pass
//! removes the pairs it resolves, so later passes only see the remainder:
//!
//! 1. exact matches (nothing to do)
//! 2. rename: same portgroup and VM, different name
//! 3. move: same name and VM, different portgroup
//! 4. disconnect: DVS ports still bound to a VM that never correlated
//!
//! Every corrective operation is attempted on its own. A rejected operation is
//! logged and recorded; the batch always runs to the end.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{error, info};

use crate::source::{DvsSink, OperationError};
use crate::{PortHandle, PortRecord, SegmentKey, SegmentTable};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What pass 4 does with DVS ports still bound to the wrong VM.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisconnectPolicy {
    /// Detach the VM adapter (VM-visible).
    #[default]
    Disconnect,
    /// Only report the port.
    ReportOnly,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlignOptions {
    pub disconnect_policy: DisconnectPolicy,
    /// Blank the name of uncorrelated, unbound DVS ports after pass 4.
    pub clear_orphan_names: bool,
}

/// Explicit permission to mutate the DVS. [`execute`] cannot be called without one.
///
/// The only public constructor is [`AlignAuthorization::from_confirmation`],
/// which refuses unless the operator confirmed the run.
#[derive(Debug)]
pub struct AlignAuthorization {
    _private: (),
}

impl AlignAuthorization {
    /// Turn the operator's answer into a token.
    ///
    /// # Errors
    /// [`AlignNotAuthorized`] when `confirmed` is false.
    pub fn from_confirmation(confirmed: bool) -> Result<Self, AlignNotAuthorized> {
        if confirmed {
            Ok(Self { _private: () })
        } else {
            Err(AlignNotAuthorized)
        }
    }
}

/// The operator did not confirm that the DVS may be changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlignNotAuthorized;

impl fmt::Display for AlignNotAuthorized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DVS changes were not confirmed by the operator")
    }
}

impl std::error::Error for AlignNotAuthorized {}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CorrectiveOp {
    Rename {
        port: PortHandle,
        from: String,
        to: String,
    },
    Move {
        port: PortHandle,
        port_id: String,
        from_segment: String,
        to_segment: String,
    },
    Disconnect {
        port: PortHandle,
        port_id: String,
        device_id: String,
    },
    ClearName {
        port: PortHandle,
        name: String,
    },
}

impl fmt::Display for CorrectiveOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectiveOp::Rename { from, to, .. } => {
                write!(f, "rename DVS port from {from} to {to}")
            }
            CorrectiveOp::Move {
                port_id,
                from_segment,
                to_segment,
                ..
            } => write!(
                f,
                "move DVS port {port_id} from portgroup {from_segment} to {to_segment}"
            ),
            CorrectiveOp::Disconnect {
                port_id, device_id, ..
            } => write!(
                f,
                "disconnect DVS port {port_id} (VM instanceUuid = {device_id})"
            ),
            CorrectiveOp::ClearName { name, .. } => {
                write!(f, "rename orphaned DVS port {name} to blank")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationFailure {
    /// The DVS rejected the operation.
    Platform(OperationError),
    /// Move target has no portgroup on the DVS.
    SegmentNotFound { name: String },
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationFailure::Platform(e) => write!(f, "platform error: {e}"),
            OperationFailure::SegmentNotFound { name } => {
                write!(f, "no portgroup found with name {name}")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationOutcome {
    pub op: CorrectiveOp,
    pub result: Result<(), OperationFailure>,
}

impl OperationOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything one executor run did, pass by pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlignReport {
    /// Neutron records that already matched exactly.
    pub exact_matches: Vec<PortRecord>,
    pub renames: Vec<OperationOutcome>,
    pub moves: Vec<OperationOutcome>,
    pub disconnects: Vec<OperationOutcome>,
    /// Bound, uncorrelated DVS ports left alone under [`DisconnectPolicy::ReportOnly`].
    pub misconnected: Vec<PortRecord>,
    pub cleared_names: Vec<OperationOutcome>,
    /// DVS records no pass resolved.
    pub unmatched_dvs: Vec<PortRecord>,
    /// Neutron records with no DVS counterpart resolved.
    pub unmatched_neutron: Vec<PortRecord>,
}

impl AlignReport {
    fn outcomes(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.renames
            .iter()
            .chain(&self.moves)
            .chain(&self.disconnects)
            .chain(&self.cleared_names)
    }

    /// Operations issued to the DVS (a move to an unknown portgroup is never issued).
    pub fn operations_issued(&self) -> usize {
        self.outcomes()
            .filter(|o| !matches!(o.result, Err(OperationFailure::SegmentNotFound { .. })))
            .count()
    }

    pub fn failures(&self) -> Vec<&OperationOutcome> {
        self.outcomes().filter(|o| !o.succeeded()).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failures().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

struct WorkingSet {
    dvs: Vec<PortRecord>,
    neutron: Vec<PortRecord>,
    /// DVS ports paired with a Neutron port in pass 2 or 3, whatever the result.
    correlated: BTreeSet<PortHandle>,
}

impl WorkingSet {
    /// Pair each Neutron record with the first DVS record satisfying `pairs`,
    /// call `apply` on the pair, and drop both when it succeeds.
    ///
    /// A DVS record whose operation failed stays in the working set for the
    /// next pass but is not offered again within this one.
    fn correlate<P, A>(&mut self, pairs: P, mut apply: A)
    where
        P: Fn(&PortRecord, &PortRecord) -> bool,
        A: FnMut(&PortRecord, &PortRecord) -> bool,
    {
        let mut tried = BTreeSet::new();
        let mut i = 0;
        while i < self.neutron.len() {
            let os_rec = &self.neutron[i];
            let found = self
                .dvs
                .iter()
                .position(|d| !tried.contains(&d.backing) && pairs(d, os_rec));

            let Some(j) = found else {
                i += 1;
                continue;
            };

            tried.insert(self.dvs[j].backing.clone());
            self.correlated.insert(self.dvs[j].backing.clone());
            if apply(&self.dvs[j], os_rec) {
                self.dvs.remove(j);
                self.neutron.remove(i);
            } else {
                i += 1;
            }
        }
    }
}

fn attempt(op: CorrectiveOp, result: Result<(), OperationFailure>) -> OperationOutcome {
    match &result {
        Ok(()) => info!(port = %op_port(&op), "{op}"),
        Err(e) => error!(port = %op_port(&op), error = %e, "failed to {op}"),
    }
    OperationOutcome { op, result }
}

fn op_port(op: &CorrectiveOp) -> &PortHandle {
    match op {
        CorrectiveOp::Rename { port, .. }
        | CorrectiveOp::Move { port, .. }
        | CorrectiveOp::Disconnect { port, .. }
        | CorrectiveOp::ClearName { port, .. } => port,
    }
}

/// Run the four passes against `sink`. Neutron records are ground truth and
/// never mutated; only the DVS is written to, one operation at a time.
pub fn execute<S: DvsSink + ?Sized>(
    sink: &mut S,
    _authorization: &AlignAuthorization,
    dvs: Vec<PortRecord>,
    neutron: Vec<PortRecord>,
    segments: &SegmentTable,
    options: &AlignOptions,
) -> AlignReport {
    let mut report = AlignReport::default();
    let mut ws = WorkingSet {
        dvs,
        neutron,
        correlated: BTreeSet::new(),
    };

    // 1) Exact matches
    let mut i = 0;
    while i < ws.neutron.len() {
        match ws.dvs.iter().position(|d| d.matches_exactly(&ws.neutron[i])) {
            Some(j) => {
                ws.dvs.remove(j);
                report.exact_matches.push(ws.neutron.remove(i));
            }
            None => i += 1,
        }
    }

    // 2) Rename: same portgroup, same VM (or unattached on both sides), different name
    ws.correlate(
        |d, o| {
            d.device_id == o.device_id
                && d.segment_name == o.segment_name
                && d.port_id != o.port_id
        },
        |d, o| {
            let op = CorrectiveOp::Rename {
                port: d.backing.clone(),
                from: d.port_id.clone(),
                to: o.port_id.clone(),
            };
            let result = sink
                .rename(&d.backing, &o.port_id)
                .map_err(OperationFailure::Platform);
            let outcome = attempt(op, result);
            let ok = outcome.succeeded();
            report.renames.push(outcome);
            ok
        },
    );

    // 3) Move: same name, same VM, different portgroup
    ws.correlate(
        |d, o| {
            d.port_id == o.port_id && d.device_id == o.device_id && d.segment_name != o.segment_name
        },
        |d, o| {
            let op = CorrectiveOp::Move {
                port: d.backing.clone(),
                port_id: d.port_id.clone(),
                from_segment: d.segment_name.clone(),
                to_segment: o.segment_name.clone(),
            };
            let result = match segments.key_for_name(&o.segment_name) {
                Some(key) => move_to(&mut *sink, &d.backing, key),
                None => Err(OperationFailure::SegmentNotFound {
                    name: o.segment_name.clone(),
                }),
            };
            let outcome = attempt(op, result);
            let ok = outcome.succeeded();
            report.moves.push(outcome);
            ok
        },
    );

    // 4) Disconnect whatever is still bound and never correlated
    for d in ws.dvs.iter_mut() {
        if ws.correlated.contains(&d.backing) {
            continue;
        }
        let Some(device_id) = d.device_id.clone() else {
            continue;
        };
        match options.disconnect_policy {
            DisconnectPolicy::ReportOnly => report.misconnected.push(d.clone()),
            DisconnectPolicy::Disconnect => {
                let op = CorrectiveOp::Disconnect {
                    port: d.backing.clone(),
                    port_id: d.port_id.clone(),
                    device_id,
                };
                let result = sink
                    .disconnect(&d.backing)
                    .map_err(OperationFailure::Platform);
                let outcome = attempt(op, result);
                if outcome.succeeded() {
                    d.device_id = None;
                }
                report.disconnects.push(outcome);
            }
        }
    }

    if options.clear_orphan_names {
        for d in ws.dvs.iter_mut() {
            if ws.correlated.contains(&d.backing)
                || d.device_id.is_some()
                || d.port_id.trim().is_empty()
            {
                continue;
            }
            let op = CorrectiveOp::ClearName {
                port: d.backing.clone(),
                name: d.port_id.clone(),
            };
            let result = sink.rename(&d.backing, "").map_err(OperationFailure::Platform);
            let outcome = attempt(op, result);
            if outcome.succeeded() {
                d.port_id.clear();
            }
            report.cleared_names.push(outcome);
        }
    }

    report.unmatched_dvs = ws.dvs;
    report.unmatched_neutron = ws.neutron;
    report
}

fn move_to<S: DvsSink + ?Sized>(
    sink: &mut S,
    port: &PortHandle,
    key: &SegmentKey,
) -> Result<(), OperationFailure> {
    sink.move_port(port, key).map_err(OperationFailure::Platform)
}

/// Sink that accepts every operation without touching anything.
#[derive(Debug, Default)]
pub(crate) struct DryRunSink;

impl DvsSink for DryRunSink {
    fn rename(&mut self, _port: &PortHandle, _new_name: &str) -> Result<(), OperationError> {
        Ok(())
    }

    fn move_port(
        &mut self,
        _port: &PortHandle,
        _destination: &SegmentKey,
    ) -> Result<(), OperationError> {
        Ok(())
    }

    fn disconnect(&mut self, _port: &PortHandle) -> Result<(), OperationError> {
        Ok(())
    }
}

/// Compute what [`execute`] would do, assuming every operation succeeds.
pub fn plan(
    dvs: Vec<PortRecord>,
    neutron: Vec<PortRecord>,
    segments: &SegmentTable,
    options: &AlignOptions,
) -> AlignReport {
    execute(
        &mut DryRunSink,
        &AlignAuthorization { _private: () },
        dvs,
        neutron,
        segments,
        options,
    )
}
