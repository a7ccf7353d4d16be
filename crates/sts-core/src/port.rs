//! Switch ports
//!
//! Port descriptors are owned by the protocol engine; the entity layer only
//! reads them through [`PortTable`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::identity::{Dpid, MacAddr};

/// Physical port descriptor (the `ofp_phy_port` of OpenFlow 1.0)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhyPort {
    pub port_no: u16,
    pub hw_addr: MacAddr,
    pub name: String,
}

impl PhyPort {
    pub fn new(port_no: u16, hw_addr: MacAddr, name: impl Into<String>) -> Self {
        Self {
            port_no,
            hw_addr,
            name: name.into(),
        }
    }
}

impl fmt::Display for PhyPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.port_no)
    }
}

/// Read access to a switch's port table
pub trait PortTable {
    /// Datapath id of the switch owning the table
    fn dpid(&self) -> Dpid;

    /// All ports keyed by port number
    fn ports(&self) -> &BTreeMap<u16, PhyPort>;

    /// Look up a single port
    fn port(&self, port_no: u16) -> Option<&PhyPort> {
        self.ports().get(&port_no)
    }

    /// Look up a port, failing with a configuration error when absent
    fn require_port(&self, port_no: u16) -> Result<&PhyPort, ConfigError> {
        self.port(port_no).ok_or(ConfigError::UnknownPort {
            dpid: self.dpid(),
            port_no,
        })
    }
}

/// A port given either by number or by descriptor
///
/// Numbers are resolved against a [`PortTable`]; descriptors are taken as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortRef {
    Number(u16),
    Port(PhyPort),
}

impl PortRef {
    /// Resolve this reference against a switch's port table
    pub fn resolve<T: PortTable + ?Sized>(self, table: &T) -> Result<PhyPort, ConfigError> {
        match self {
            PortRef::Number(port_no) => table.require_port(port_no).cloned(),
            PortRef::Port(port) => Ok(port),
        }
    }
}

impl From<u16> for PortRef {
    fn from(port_no: u16) -> Self {
        PortRef::Number(port_no)
    }
}

impl From<PhyPort> for PortRef {
    fn from(port: PhyPort) -> Self {
        PortRef::Port(port)
    }
}

impl From<&PhyPort> for PortRef {
    fn from(port: &PhyPort) -> Self {
        PortRef::Port(port.clone())
    }
}

/// Build a port table of `count` ports numbered from 1, as a fresh switch has
pub fn numbered_ports(dpid: Dpid, count: u16) -> BTreeMap<u16, PhyPort> {
    (1..=count)
        .map(|port_no| {
            let port = PhyPort::new(
                port_no,
                MacAddr::for_port(dpid, port_no),
                format!("s{}-eth{}", dpid, port_no),
            );
            (port_no, port)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Table {
        dpid: Dpid,
        ports: BTreeMap<u16, PhyPort>,
    }

    impl PortTable for Table {
        fn dpid(&self) -> Dpid {
            self.dpid
        }

        fn ports(&self) -> &BTreeMap<u16, PhyPort> {
            &self.ports
        }
    }

    #[test]
    fn test_numbered_ports() {
        let ports = numbered_ports(Dpid(3), 4);
        assert_eq!(ports.len(), 4);
        assert_eq!(ports[&1].name, "s3-eth1");
        assert_eq!(ports[&4].port_no, 4);
        assert!(!ports.contains_key(&0));
    }

    #[test]
    fn test_port_ref_resolution() {
        let table = Table {
            dpid: Dpid(1),
            ports: numbered_ports(Dpid(1), 2),
        };

        let port = PortRef::from(2).resolve(&table).unwrap();
        assert_eq!(port.port_no, 2);

        let err = PortRef::from(9).resolve(&table).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownPort {
                dpid: Dpid(1),
                port_no: 9
            }
        ));

        let foreign = PhyPort::new(9, MacAddr::ZERO, "x");
        assert_eq!(PortRef::from(&foreign).resolve(&table).unwrap(), foreign);
    }
}
