//! Controller configuration and endpoint descriptors

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;

/// Default OpenFlow controller port
pub const DEFAULT_CONTROLLER_PORT: u16 = 6633;

/// Where a switch should connect to reach a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControllerInfo {
    pub address: IpAddr,
    pub port: u16,
}

impl ControllerInfo {
    pub fn new(address: IpAddr, port: u16) -> Self {
        Self { address, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

impl From<SocketAddr> for ControllerInfo {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

impl fmt::Display for ControllerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

/// Configuration of one supervised controller process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Identity of the controller
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    /// Short name used to tag log output
    #[serde(default)]
    pub label: Option<String>,
    /// Address the controller listens on
    #[serde(default = "default_address")]
    pub address: IpAddr,
    /// Port the controller listens on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Command line template; `__address__` and `__port__` are substituted
    pub cmdline: String,
    /// Working directory for the process
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

fn default_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    DEFAULT_CONTROLLER_PORT
}

impl ControllerConfig {
    /// Create a configuration listening on localhost at the default port
    pub fn new(cmdline: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            label: None,
            address: default_address(),
            port: default_port(),
            cmdline: cmdline.into(),
            cwd: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_endpoint(mut self, address: IpAddr, port: u16) -> Self {
        self.address = address;
        self.port = port;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Label used in logs: the configured one, or `c<uuid>`
    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("c{}", self.uuid))
    }

    /// Endpoint switches use to reach this controller
    pub fn endpoint(&self) -> ControllerInfo {
        ControllerInfo::new(self.address, self.port)
    }

    /// Argument vector with the endpoint substituted
    pub fn expanded_cmdline(&self) -> Result<Vec<String>, ConfigError> {
        let address = self.address.to_string();
        let port = self.port.to_string();
        let argv: Vec<String> = self
            .cmdline
            .split_whitespace()
            .map(|arg| {
                arg.replace("__address__", &address)
                    .replace("__port__", &port)
            })
            .collect();
        if argv.is_empty() {
            return Err(ConfigError::EmptyCommandLine(self.label()));
        }
        Ok(argv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expanded_cmdline() {
        let config = ControllerConfig::new("./pox.py openflow.of_01 --address=__address__ --port=__port__")
            .with_endpoint("10.0.0.5".parse().unwrap(), 7000);
        let argv = config.expanded_cmdline().unwrap();
        assert_eq!(
            argv,
            vec![
                "./pox.py",
                "openflow.of_01",
                "--address=10.0.0.5",
                "--port=7000"
            ]
        );
        assert_eq!(config.endpoint().socket_addr(), "10.0.0.5:7000".parse().unwrap());
    }

    #[test]
    fn test_empty_cmdline_rejected() {
        let config = ControllerConfig::new("   ").with_label("c1");
        let err = config.expanded_cmdline().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyCommandLine(label) if label == "c1"));
    }

    #[test]
    fn test_default_label_uses_uuid() {
        let config = ControllerConfig::new("sleep 1");
        assert_eq!(config.label(), format!("c{}", config.uuid));
        assert_eq!(config.endpoint().port, DEFAULT_CONTROLLER_PORT);
    }

    #[test]
    fn test_controller_info_from_socket_addr() {
        let addr: SocketAddr = "127.0.0.1:6633".parse().unwrap();
        let info = ControllerInfo::from(addr);
        assert_eq!(info.socket_addr(), addr);
        assert_eq!(info.to_string(), "127.0.0.1:6633");
    }
}
