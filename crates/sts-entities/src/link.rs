//! Topology edges
//!
//! - [`Link`]: directed switch-to-switch edge
//! - [`AccessLink`]: bidirectional host-to-switch edge

use std::fmt;

use serde::{Deserialize, Serialize};
use sts_core::{ConfigError, Dpid, PhyPort, PortRef, PortTable};

use crate::host::{Host, HostInterface};

/// A directed link between two switch ports
///
/// Ports given by number are resolved against the port table of the switch
/// they belong to: the start port against the start switch and the end port
/// against the end switch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    start_dpid: Dpid,
    start_port: PhyPort,
    end_dpid: Dpid,
    end_port: PhyPort,
}

impl Link {
    pub fn new<S, T>(
        start: &S,
        start_port: impl Into<PortRef>,
        end: &T,
        end_port: impl Into<PortRef>,
    ) -> Result<Self, ConfigError>
    where
        S: PortTable + ?Sized,
        T: PortTable + ?Sized,
    {
        Ok(Self {
            start_dpid: start.dpid(),
            start_port: start_port.into().resolve(start)?,
            end_dpid: end.dpid(),
            end_port: end_port.into().resolve(end)?,
        })
    }

    pub fn start_dpid(&self) -> Dpid {
        self.start_dpid
    }

    pub fn start_port(&self) -> &PhyPort {
        &self.start_port
    }

    pub fn end_dpid(&self) -> Dpid {
        self.end_dpid
    }

    pub fn end_port(&self) -> &PhyPort {
        &self.end_port
    }

    /// The same link in the opposite direction
    ///
    /// The result need not exist in the topology.
    pub fn reversed(&self) -> Self {
        Self {
            start_dpid: self.end_dpid,
            start_port: self.end_port.clone(),
            end_dpid: self.start_dpid,
            end_port: self.start_port.clone(),
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}:{}) -> ({}:{})",
            self.start_dpid, self.start_port.port_no, self.end_dpid, self.end_port.port_no
        )
    }
}

/// A bidirectional edge between a host interface and an ingress switch port
///
/// The interface and port are typed values; there is no port-number
/// shorthand here.
///
/// ```
/// use sts_core::{Dpid, EventBus, MacAddr, MockEngine, PortTable};
/// use sts_entities::{AccessLink, Host, HostInterface};
///
/// let bus = EventBus::new();
/// let eth0 = HostInterface::new(MacAddr([0, 0, 0, 0, 0, 1]), [], "eth0");
/// let host = Host::new("h1", vec![eth0.clone()], &bus);
/// let switch: MockEngine = MockEngine::new(Dpid(1), 2);
///
/// let link = AccessLink::new(&host, &eth0, &switch, switch.require_port(1).unwrap()).unwrap();
/// assert_eq!(link.switch_dpid(), Dpid(1));
/// ```
///
/// A raw integer is not an interface:
///
/// ```compile_fail
/// use sts_core::{Dpid, EventBus, MacAddr, MockEngine, PortTable};
/// use sts_entities::{AccessLink, Host, HostInterface};
///
/// let bus = EventBus::new();
/// let eth0 = HostInterface::new(MacAddr([0, 0, 0, 0, 0, 1]), [], "eth0");
/// let host = Host::new("h1", vec![eth0], &bus);
/// let switch: MockEngine = MockEngine::new(Dpid(1), 2);
///
/// let link = AccessLink::new(&host, 0, &switch, switch.require_port(1).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessLink {
    host: String,
    interface: HostInterface,
    switch_dpid: Dpid,
    switch_port: PhyPort,
}

impl AccessLink {
    /// Connect `interface` of `host` to `switch_port` of `switch`
    ///
    /// Fails if the interface is not one of the host's, or if the port is
    /// not the descriptor the switch holds under that number.
    pub fn new<S>(
        host: &Host,
        interface: &HostInterface,
        switch: &S,
        switch_port: &PhyPort,
    ) -> Result<Self, ConfigError>
    where
        S: PortTable + ?Sized,
    {
        if !host.has_interface(interface) {
            return Err(ConfigError::UnknownInterface {
                host: host.name().to_string(),
                interface: interface.name().to_string(),
            });
        }

        let owned = switch.require_port(switch_port.port_no)?;
        if owned != switch_port {
            return Err(ConfigError::PortMismatch {
                dpid: switch.dpid(),
                port_no: switch_port.port_no,
            });
        }

        Ok(Self {
            host: host.name().to_string(),
            interface: interface.clone(),
            switch_dpid: switch.dpid(),
            switch_port: switch_port.clone(),
        })
    }

    /// Name of the host end
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn interface(&self) -> &HostInterface {
        &self.interface
    }

    pub fn switch_dpid(&self) -> Dpid {
        self.switch_dpid
    }

    pub fn switch_port(&self) -> &PhyPort {
        &self.switch_port
    }
}

impl fmt::Display for AccessLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} <-> ({}:{})",
            self.host,
            self.interface.name(),
            self.switch_dpid,
            self.switch_port.port_no
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use sts_core::{EventBus, MacAddr, MockEngine};

    fn switch(dpid: u64, ports: u16) -> MockEngine {
        MockEngine::new(Dpid(dpid), ports)
    }

    #[test]
    fn test_link_resolves_port_numbers() {
        let s1 = switch(1, 2);
        let s2 = switch(2, 2);

        let link = Link::new(&s1, 1u16, &s2, 2u16).unwrap();
        assert_eq!(link.start_port(), s1.port(1).unwrap());
        assert_eq!(link.end_port(), s2.port(2).unwrap());
        assert_eq!(link.to_string(), "(1:1) -> (2:2)");
    }

    #[test]
    fn test_link_accepts_descriptors() {
        let s1 = switch(1, 2);
        let s2 = switch(2, 2);

        let by_number = Link::new(&s1, 2u16, &s2, 1u16).unwrap();
        let by_port = Link::new(&s1, s1.port(2).unwrap(), &s2, s2.port(1).unwrap()).unwrap();
        assert_eq!(by_number, by_port);
    }

    #[test]
    fn test_link_unknown_start_port() {
        let s1 = switch(1, 2);
        let s2 = switch(2, 2);

        let err = Link::new(&s1, 9u16, &s2, 1u16).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownPort {
                dpid: Dpid(1),
                port_no: 9
            }
        ));
    }

    #[test]
    fn test_end_port_checked_against_end_switch() {
        // Port 4 exists only on the end switch.
        let s1 = switch(1, 2);
        let s2 = switch(2, 4);
        let link = Link::new(&s1, 1u16, &s2, 4u16).unwrap();
        assert_eq!(link.end_port().port_no, 4);

        // Port 4 exists only on the start switch.
        let s3 = switch(3, 4);
        let s4 = switch(4, 2);
        let err = Link::new(&s3, 1u16, &s4, 4u16).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownPort {
                dpid: Dpid(4),
                port_no: 4
            }
        ));
    }

    #[test]
    fn test_reversed_twice_is_identity() {
        let s1 = switch(1, 3);
        let s2 = switch(2, 3);
        let link = Link::new(&s1, 3u16, &s2, 1u16).unwrap();

        let back = link.reversed();
        assert_eq!(back.to_string(), "(2:1) -> (1:3)");
        assert_ne!(back, link);
        assert_eq!(back.reversed(), link);
    }

    #[test]
    fn test_links_hash_structurally() {
        let s1 = switch(1, 2);
        let s2 = switch(2, 2);
        let set: HashSet<Link> = [
            Link::new(&s1, 1u16, &s2, 1u16).unwrap(),
            Link::new(&s1, 1u16, &s2, 1u16).unwrap(),
            Link::new(&s2, 1u16, &s1, 1u16).unwrap(),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
    }

    fn host_with_eth0(bus: &EventBus) -> (Host, HostInterface) {
        let eth0 = HostInterface::new(
            MacAddr([0, 0, 0, 0, 0, 1]),
            ["10.0.0.1".parse().unwrap()],
            "eth0",
        );
        (Host::new("h1", vec![eth0.clone()], bus), eth0)
    }

    #[test]
    fn test_access_link() {
        let bus = EventBus::new();
        let (host, eth0) = host_with_eth0(&bus);
        let s1 = switch(1, 2);

        let link = AccessLink::new(&host, &eth0, &s1, s1.port(2).unwrap()).unwrap();
        assert_eq!(link.host(), "h1");
        assert_eq!(link.interface(), &eth0);
        assert_eq!(link.switch_port().port_no, 2);
        assert_eq!(link.to_string(), "h1:eth0 <-> (1:2)");
    }

    #[test]
    fn test_access_link_rejects_foreign_interface() {
        let bus = EventBus::new();
        let (host, _) = host_with_eth0(&bus);
        let s1 = switch(1, 2);
        let stranger = HostInterface::new(MacAddr([0, 0, 0, 0, 0, 9]), [], "eth0");

        let err = AccessLink::new(&host, &stranger, &s1, s1.port(1).unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownInterface { .. }));
    }

    #[test]
    fn test_access_link_rejects_foreign_port() {
        let bus = EventBus::new();
        let (host, eth0) = host_with_eth0(&bus);
        let s1 = switch(1, 2);
        let s2 = switch(2, 4);

        // Same number, other switch's descriptor.
        let err = AccessLink::new(&host, &eth0, &s1, s2.port(1).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::PortMismatch {
                dpid: Dpid(1),
                port_no: 1
            }
        ));

        // Number the switch does not have at all.
        let err = AccessLink::new(&host, &eth0, &s1, s2.port(4).unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPort { .. }));
    }
}
