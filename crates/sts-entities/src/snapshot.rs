//! Inspection snapshot of a switch
//!
//! Built field by field from a live switch; sockets, handlers and loggers
//! are never part of it. It is not a restore format.

use serde::{Deserialize, Serialize};
use sts_core::{Dpid, PhyPort, StsResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchSnapshot {
    pub dpid: Dpid,
    /// Name of the controller owning the switch, if any
    pub parent_controller: Option<String>,
    /// Port descriptors ordered by port number
    pub ports: Vec<PhyPort>,
}

impl SwitchSnapshot {
    /// Encode with postcard
    pub fn to_bytes(&self) -> StsResult<Vec<u8>> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> StsResult<Self> {
        Ok(postcard::from_bytes(bytes)?)
    }
}
