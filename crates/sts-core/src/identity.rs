//! Entity identities
//!
//! - [`Dpid`]: datapath id of a simulated switch
//! - [`MacAddr`]: hardware address of a port or host interface

use std::fmt;
use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Datapath id, unique per simulated switch
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("{_0}")]
pub struct Dpid(pub u64);

impl Dpid {
    /// Get the raw datapath id
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Zero-padded hex form used by OpenFlow tooling (`00:00:00:00:00:00:00:01`)
    pub fn to_colon_hex(&self) -> String {
        self.0
            .to_be_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl From<u64> for Dpid {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// 48-bit Ethernet hardware address
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const ZERO: MacAddr = MacAddr([0; 6]);

    /// Locally administered address derived from a switch and port number
    pub fn for_port(dpid: Dpid, port_no: u16) -> Self {
        let d = dpid.0.to_be_bytes();
        let p = port_no.to_be_bytes();
        MacAddr([0x02, d[5], d[6], d[7], p[0], p[1]])
    }

    /// Address as an integer, for comparisons against other representations
    pub fn to_u64(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|b| format!("{:02x}", b)).collect();
        write!(f, "{}", parts.join(":"))
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({})", self)
    }
}

impl FromStr for MacAddr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidMacAddress(s.to_string());
        let parts: Vec<&str> = s.split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(invalid());
        }
        let mut octets = [0u8; 6];
        for (octet, part) in octets.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(invalid());
            }
            let decoded = hex::decode(part).map_err(|_| invalid())?;
            *octet = decoded[0];
        }
        Ok(MacAddr(octets))
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dpid_display() {
        assert_eq!(Dpid(42).to_string(), "42");
        assert_eq!(Dpid(1).to_colon_hex(), "00:00:00:00:00:00:00:01");
    }

    #[test]
    fn test_mac_roundtrip_text() {
        let mac: MacAddr = "00:1b:2C:ff:00:01".parse().unwrap();
        assert_eq!(mac.0, [0x00, 0x1b, 0x2c, 0xff, 0x00, 0x01]);
        assert_eq!(mac.to_string(), "00:1b:2c:ff:00:01");

        let dashed: MacAddr = "00-1b-2c-ff-00-01".parse().unwrap();
        assert_eq!(mac, dashed);
    }

    #[test]
    fn test_mac_rejects_garbage() {
        assert!("00:11:22:33:44".parse::<MacAddr>().is_err());
        assert!("00:11:22:33:44:zz".parse::<MacAddr>().is_err());
        assert!("000:11:22:33:44:55".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_mac_for_port() {
        let mac = MacAddr::for_port(Dpid(1), 3);
        assert_eq!(mac.0, [0x02, 0, 0, 1, 0, 3]);
        assert_ne!(mac, MacAddr::for_port(Dpid(2), 3));
        assert_eq!(MacAddr([0, 0, 0, 0, 1, 2]).to_u64(), 0x0102);
    }
}
