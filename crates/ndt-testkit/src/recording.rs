use std::collections::BTreeMap;

use ndt_reconcile::snapshot_adapter::DvsInventory;
use ndt_reconcile::source::{DvsSink, DvsSource, OperationError, SourceError};
use ndt_reconcile::{PortHandle, PortScope, RawDevice, RawDvsPort, Segment, SegmentKey};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedOp {
    Rename { port: String, name: String },
    Move { port: String, to: String },
    Disconnect { port: String },
}

/// [`DvsInventory`] that records every sink call and can reject calls per port.
///
/// A rejected call leaves the inventory untouched.
#[derive(Debug)]
pub struct RecordingDvs {
    inner: DvsInventory,
    ops: Vec<RecordedOp>,
    fail: BTreeMap<String, String>,
}

impl RecordingDvs {
    pub fn new(inner: DvsInventory) -> Self {
        Self {
            inner,
            ops: Vec::new(),
            fail: BTreeMap::new(),
        }
    }

    /// Reject every operation on `port` with `message`.
    pub fn fail_on(&mut self, port: &str, message: &str) {
        self.fail.insert(port.to_string(), message.to_string());
    }

    pub fn clear_failures(&mut self) {
        self.fail.clear();
    }

    pub fn operations(&self) -> &[RecordedOp] {
        &self.ops
    }

    pub fn take_operations(&mut self) -> Vec<RecordedOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn inventory(&self) -> &DvsInventory {
        &self.inner
    }

    pub fn into_inner(self) -> DvsInventory {
        self.inner
    }

    fn record(&mut self, port: &PortHandle, op: RecordedOp) -> Result<(), OperationError> {
        self.ops.push(op);
        match self.fail.get(port.as_str()) {
            Some(msg) => Err(OperationError::new(msg.clone())),
            None => Ok(()),
        }
    }
}

impl DvsSource for RecordingDvs {
    fn list_ports(&self, scope: &PortScope) -> Result<Vec<RawDvsPort>, SourceError> {
        self.inner.list_ports(scope)
    }

    fn list_devices(&self) -> Result<Vec<RawDevice>, SourceError> {
        self.inner.list_devices()
    }

    fn list_segments(&self) -> Result<Vec<Segment>, SourceError> {
        self.inner.list_segments()
    }
}

impl DvsSink for RecordingDvs {
    fn rename(&mut self, port: &PortHandle, new_name: &str) -> Result<(), OperationError> {
        self.record(
            port,
            RecordedOp::Rename {
                port: port.to_string(),
                name: new_name.to_string(),
            },
        )?;
        self.inner.rename(port, new_name)
    }

    fn move_port(
        &mut self,
        port: &PortHandle,
        destination: &SegmentKey,
    ) -> Result<(), OperationError> {
        self.record(
            port,
            RecordedOp::Move {
                port: port.to_string(),
                to: destination.to_string(),
            },
        )?;
        self.inner.move_port(port, destination)
    }

    fn disconnect(&mut self, port: &PortHandle) -> Result<(), OperationError> {
        self.record(
            port,
            RecordedOp::Disconnect {
                port: port.to_string(),
            },
        )?;
        self.inner.disconnect(port)
    }
}
