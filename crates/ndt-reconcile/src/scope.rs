use crate::RawDvsPort;

/// Which DVS ports take part in reporting and reconciliation.
///
/// A port is in scope when it is plugged into a VM network adapter, or when
/// it carries a name but is currently disconnected. Blank disconnected ports
/// and ports plugged into anything other than a VM (uplinks, vmknics) are
/// never in scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortScope;

impl PortScope {
    pub fn admits(&self, port: &RawDvsPort) -> bool {
        match &port.connectee {
            Some(_) => port.connected_vm().is_some(),
            None => port.configured_name().is_some(),
        }
    }

    /// Keep in-scope ports, preserving order.
    pub fn filter(&self, ports: impl IntoIterator<Item = RawDvsPort>) -> Vec<RawDvsPort> {
        ports.into_iter().filter(|p| self.admits(p)).collect()
    }
}
