//! Observable entity events
//!
//! The set of event kinds is closed: control-plane messages seen by a switch
//! and data-plane packets sent out by a host or switch.

use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::identity::Dpid;
use crate::message::OfpMessage;
use crate::port::PhyPort;

/// Kinds of events an entity may declare and an observer may subscribe to
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[display("control-plane-message")]
    ControlPlaneMessage,
    #[display("data-plane-packet-out")]
    DataPlanePacketOut,
}

/// The entity an event came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSource {
    Switch(Dpid),
    Host(String),
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Switch(dpid) => write!(f, "switch {}", dpid),
            Self::Host(name) => write!(f, "host {}", name),
        }
    }
}

/// Which way a control-plane message travelled
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Controller to switch, observed after the switch handled it
    #[display("inbound")]
    Inbound,
    /// Switch to controller, observed after it was put on the wire
    #[display("outbound")]
    Outbound,
}

/// A control-plane message was sent or received by a switch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpMessageEvent {
    pub dpid: Dpid,
    pub direction: Direction,
    /// Peer addresses of the controller connections the message used
    pub connections_used: Vec<SocketAddr>,
    pub message: OfpMessage,
    pub timestamp: DateTime<Utc>,
}

impl CpMessageEvent {
    pub fn inbound(dpid: Dpid, connection: SocketAddr, message: OfpMessage) -> Self {
        Self {
            dpid,
            direction: Direction::Inbound,
            connections_used: vec![connection],
            message,
            timestamp: Utc::now(),
        }
    }

    pub fn outbound(dpid: Dpid, connections_used: Vec<SocketAddr>, message: OfpMessage) -> Self {
        Self {
            dpid,
            direction: Direction::Outbound,
            connections_used,
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Where a data-plane packet left its entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Egress {
    /// A host interface, by name
    Interface(String),
    /// A switch port
    Port(PhyPort),
}

/// A data-plane packet was sent out of a host interface or switch port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DpPacketOutEvent {
    pub source: EventSource,
    pub packet: Bytes,
    pub egress: Egress,
    pub timestamp: DateTime<Utc>,
}

impl DpPacketOutEvent {
    pub fn new(source: EventSource, packet: Bytes, egress: Egress) -> Self {
        Self {
            source,
            packet,
            egress,
            timestamp: Utc::now(),
        }
    }
}

/// An event published on the [`EventBus`](crate::bus::EventBus)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ControlPlane(CpMessageEvent),
    DataPlane(DpPacketOutEvent),
}

impl Event {
    /// The kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ControlPlane(_) => EventKind::ControlPlaneMessage,
            Self::DataPlane(_) => EventKind::DataPlanePacketOut,
        }
    }

    /// The entity that raised this event
    pub fn source(&self) -> EventSource {
        match self {
            Self::ControlPlane(e) => EventSource::Switch(e.dpid),
            Self::DataPlane(e) => e.source.clone(),
        }
    }

    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ControlPlane(e) => e.timestamp,
            Self::DataPlane(e) => e.timestamp,
        }
    }

    pub fn as_control_plane(&self) -> Option<&CpMessageEvent> {
        match self {
            Self::ControlPlane(e) => Some(e),
            Self::DataPlane(_) => None,
        }
    }

    pub fn as_data_plane(&self) -> Option<&DpPacketOutEvent> {
        match self {
            Self::DataPlane(e) => Some(e),
            Self::ControlPlane(_) => None,
        }
    }
}

impl From<CpMessageEvent> for Event {
    fn from(e: CpMessageEvent) -> Self {
        Self::ControlPlane(e)
    }
}

impl From<DpPacketOutEvent> for Event {
    fn from(e: DpPacketOutEvent) -> Self {
        Self::DataPlane(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::OfpType;

    #[test]
    fn test_event_kind_and_source() {
        let peer: SocketAddr = "127.0.0.1:6633".parse().unwrap();
        let cp: Event = CpMessageEvent::inbound(
            Dpid(4),
            peer,
            OfpMessage::header_only(OfpType::Hello, 1),
        )
        .into();
        assert_eq!(cp.kind(), EventKind::ControlPlaneMessage);
        assert_eq!(cp.source(), EventSource::Switch(Dpid(4)));
        assert_eq!(cp.as_control_plane().unwrap().connections_used, vec![peer]);
        assert!(cp.as_data_plane().is_none());

        let dp: Event = DpPacketOutEvent::new(
            EventSource::Host("h1".to_string()),
            Bytes::from_static(b"ping"),
            Egress::Interface("eth0".to_string()),
        )
        .into();
        assert_eq!(dp.kind(), EventKind::DataPlanePacketOut);
        assert_eq!(dp.source().to_string(), "host h1");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(
            EventKind::ControlPlaneMessage.to_string(),
            "control-plane-message"
        );
        assert_eq!(Direction::Outbound.to_string(), "outbound");
    }
}
