//! Control-plane messages
//!
//! The entity layer never parses OpenFlow. A message is carried as its type
//! tag, transaction id, and the encoded body the protocol engine produced.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// OpenFlow 1.0 message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OfpType {
    Hello,
    Error,
    EchoRequest,
    EchoReply,
    Vendor,
    FeaturesRequest,
    FeaturesReply,
    GetConfigRequest,
    GetConfigReply,
    SetConfig,
    PacketIn,
    FlowRemoved,
    PortStatus,
    PacketOut,
    FlowMod,
    PortMod,
    StatsRequest,
    StatsReply,
    BarrierRequest,
    BarrierReply,
    /// Any type code outside the OpenFlow 1.0 table
    Other(u8),
}

impl OfpType {
    /// Decode the wire type code
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Hello,
            1 => Self::Error,
            2 => Self::EchoRequest,
            3 => Self::EchoReply,
            4 => Self::Vendor,
            5 => Self::FeaturesRequest,
            6 => Self::FeaturesReply,
            7 => Self::GetConfigRequest,
            8 => Self::GetConfigReply,
            9 => Self::SetConfig,
            10 => Self::PacketIn,
            11 => Self::FlowRemoved,
            12 => Self::PortStatus,
            13 => Self::PacketOut,
            14 => Self::FlowMod,
            15 => Self::PortMod,
            16 => Self::StatsRequest,
            17 => Self::StatsReply,
            18 => Self::BarrierRequest,
            19 => Self::BarrierReply,
            other => Self::Other(other),
        }
    }

    /// Wire type code
    pub fn code(&self) -> u8 {
        match self {
            Self::Hello => 0,
            Self::Error => 1,
            Self::EchoRequest => 2,
            Self::EchoReply => 3,
            Self::Vendor => 4,
            Self::FeaturesRequest => 5,
            Self::FeaturesReply => 6,
            Self::GetConfigRequest => 7,
            Self::GetConfigReply => 8,
            Self::SetConfig => 9,
            Self::PacketIn => 10,
            Self::FlowRemoved => 11,
            Self::PortStatus => 12,
            Self::PacketOut => 13,
            Self::FlowMod => 14,
            Self::PortMod => 15,
            Self::StatsRequest => 16,
            Self::StatsReply => 17,
            Self::BarrierRequest => 18,
            Self::BarrierReply => 19,
            Self::Other(code) => *code,
        }
    }
}

impl fmt::Display for OfpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "OFPT_UNKNOWN({})", code),
            known => write!(f, "{:?}", known),
        }
    }
}

/// A control-plane message exchanged between a switch and a controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfpMessage {
    pub msg_type: OfpType,
    pub xid: u32,
    /// Encoded message body, opaque to the entity layer
    pub body: Bytes,
}

impl OfpMessage {
    pub fn new(msg_type: OfpType, xid: u32, body: impl Into<Bytes>) -> Self {
        Self {
            msg_type,
            xid,
            body: body.into(),
        }
    }

    /// A message with no body
    pub fn header_only(msg_type: OfpType, xid: u32) -> Self {
        Self::new(msg_type, xid, Bytes::new())
    }
}

impl fmt::Display for OfpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[xid={}, {}B]", self.msg_type, self.xid, self.body.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes_are_stable() {
        for code in 0..=u8::MAX {
            assert_eq!(OfpType::from_code(code).code(), code);
        }
        assert_eq!(OfpType::from_code(10), OfpType::PacketIn);
        assert_eq!(OfpType::from_code(200), OfpType::Other(200));
    }

    #[test]
    fn test_message_display() {
        let msg = OfpMessage::new(OfpType::EchoRequest, 7, vec![1, 2, 3]);
        assert_eq!(msg.to_string(), "EchoRequest[xid=7, 3B]");
        assert_eq!(OfpType::Other(99).to_string(), "OFPT_UNKNOWN(99)");
    }
}
