//! Hosts and their interfaces
//!
//! A [`Host`] is a bare data-plane endpoint: sending a packet publishes a
//! [`DpPacketOutEvent`] for the patch panel to route, and receiving one is
//! only observed.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sts_core::{
    ConfigError, DpPacketOutEvent, Egress, Emitter, EventBus, EventKind, EventSource, MacAddr,
    StsResult,
};
use sts_logging::EntityContextGuard;
use tracing::info;

/// Event kinds a host may raise
pub const HOST_EVENTS: &[EventKind] = &[EventKind::DataPlanePacketOut];

/// A host's network interface (e.g. `eth0`)
///
/// Two interfaces are equal when they share a name and hardware address and
/// carry the same set of IP addresses, in any order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInterface {
    hw_addr: MacAddr,
    ips: Vec<IpAddr>,
    name: String,
}

impl HostInterface {
    pub fn new(
        hw_addr: MacAddr,
        ips: impl IntoIterator<Item = IpAddr>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            hw_addr,
            ips: ips.into_iter().collect(),
            name: name.into(),
        }
    }

    pub fn hw_addr(&self) -> MacAddr {
        self.hw_addr
    }

    /// Addresses in the order they were given
    pub fn ips(&self) -> &[IpAddr] {
        &self.ips
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn ip_set(&self) -> BTreeSet<IpAddr> {
        self.ips.iter().copied().collect()
    }
}

impl PartialEq for HostInterface {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.hw_addr == other.hw_addr
            && self.ips.len() == other.ips.len()
            && self.ips.iter().all(|ip| other.ips.contains(ip))
            && other.ips.iter().all(|ip| self.ips.contains(ip))
    }
}

impl Eq for HostInterface {}

impl Hash for HostInterface {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hw_addr.hash(state);
        self.ip_set().hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for HostInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ips: Vec<String> = self.ips.iter().map(ToString::to_string).collect();
        write!(
            f,
            "HostInterface:{}:{}:[{}]",
            self.name,
            self.hw_addr,
            ips.join(", ")
        )
    }
}

/// A very simple host entity
pub struct Host {
    name: String,
    interfaces: Vec<HostInterface>,
    emitter: Emitter,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("name", &self.name)
            .field("interfaces", &self.interfaces)
            .finish()
    }
}

impl Host {
    pub fn new(name: impl Into<String>, interfaces: Vec<HostInterface>, bus: &EventBus) -> Self {
        let name = name.into();
        let emitter = bus.emitter(EventSource::Host(name.clone()), HOST_EVENTS);
        Self {
            name,
            interfaces,
            emitter,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interfaces(&self) -> &[HostInterface] {
        &self.interfaces
    }

    /// Look up an interface by name
    pub fn interface(&self, name: &str) -> Option<&HostInterface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn has_interface(&self, interface: &HostInterface) -> bool {
        self.interfaces.contains(interface)
    }

    /// Send a packet out of one of this host's interfaces
    pub fn send(&self, interface: &HostInterface, packet: impl Into<Bytes>) -> StsResult<()> {
        if !self.has_interface(interface) {
            return Err(ConfigError::UnknownInterface {
                host: self.name.clone(),
                interface: interface.name.clone(),
            }
            .into());
        }

        let packet = packet.into();
        let source = self.emitter.source().clone();
        let _ctx = EntityContextGuard::new(&source);
        info!(
            host = %self.name,
            interface = %interface.name,
            bytes = packet.len(),
            "Sending packet"
        );

        self.emitter.emit(DpPacketOutEvent::new(
            source,
            packet,
            Egress::Interface(interface.name.clone()),
        ))?;
        Ok(())
    }

    /// Observe a packet delivered to one of this host's interfaces
    pub fn receive(&self, interface: &HostInterface, packet: &[u8]) {
        info!(
            host = %self.name,
            interface = %interface.name,
            bytes = packet.len(),
            "Received packet"
        );
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
