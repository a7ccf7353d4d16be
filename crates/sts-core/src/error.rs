//! Error types for the STS entity layer

use std::net::SocketAddr;

use thiserror::Error;

use crate::event::{EventKind, EventSource};
use crate::identity::Dpid;
use crate::message::OfpType;

/// Top-level error type for the entity layer
#[derive(Debug, Error)]
pub enum StsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Switch error: {0}")]
    Switch(#[from] SwitchError),

    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<postcard::Error> for StsError {
    fn from(e: postcard::Error) -> Self {
        StsError::Serialization(e.to_string())
    }
}

/// Caller or topology mistakes. These are never defaulted away.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Switch {dpid} has no port {port_no}")]
    UnknownPort { dpid: Dpid, port_no: u16 },

    #[error("Port {port_no} does not match the descriptor owned by switch {dpid}")]
    PortMismatch { dpid: Dpid, port_no: u16 },

    #[error("Host {host} has no interface {interface}")]
    UnknownInterface { host: String, interface: String },

    #[error("No such connection {peer} on switch {dpid}")]
    ConnectionNotFound { dpid: Dpid, peer: SocketAddr },

    #[error("Invalid MAC address: {0}")]
    InvalidMacAddress(String),

    #[error("Empty command line for controller {0}")]
    EmptyCommandLine(String),
}

/// Errors related to controller transports
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Switch {0} has no live controller connection")]
    NotConnected(Dpid),
}

/// Errors raised by the protocol engine while dispatching
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("No handler installed for {0}")]
    NoHandler(OfpType),

    #[error("Handler for {msg_type} failed: {reason}")]
    HandlerFailed { msg_type: OfpType, reason: String },
}

/// Errors related to switch lifecycle misuse
#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("Switch {0} is failed; call recover() instead of connect()")]
    Failed(Dpid),
}

/// Errors related to controller process supervision
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Controller {0} is already running")]
    AlreadyRunning(String),

    #[error("Failed to spawn controller {label}: {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors related to event publication
#[derive(Debug, Error)]
pub enum EventError {
    #[error("{entity} did not declare {kind} events")]
    UndeclaredKind { entity: EventSource, kind: EventKind },
}

/// Result type alias for entity-layer operations
pub type StsResult<T> = Result<T, StsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnknownPort {
            dpid: Dpid(7),
            port_no: 42,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("7"));
        assert!(msg.contains("42"));

        let err = ConfigError::ConnectionNotFound {
            dpid: Dpid(1),
            peer: "10.0.0.1:6633".parse().unwrap(),
        };
        assert!(format!("{}", err).contains("10.0.0.1:6633"));

        let err = ConfigError::UnknownInterface {
            host: "h1".to_string(),
            interface: "eth9".to_string(),
        };
        assert!(format!("{}", err).contains("eth9"));
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::ConnectionFailed("refused".to_string());
        assert!(format!("{}", err).contains("Connection failed"));

        assert!(format!("{}", TransportError::ConnectionClosed).contains("closed"));
        assert!(format!("{}", TransportError::NotConnected(Dpid(3))).contains("3"));
    }

    #[test]
    fn test_process_error_display() {
        let err = ProcessError::Spawn {
            label: "c1".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("c1"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_conversions() {
        let err: StsError = ConfigError::InvalidMacAddress("zz".to_string()).into();
        assert!(matches!(err, StsError::Config(_)));

        let err: StsError = TransportError::ConnectionClosed.into();
        assert!(matches!(err, StsError::Transport(_)));

        let err: StsError = ProtocolError::NoHandler(OfpType::Hello).into();
        assert!(matches!(err, StsError::Protocol(_)));

        let err: StsError = SwitchError::Failed(Dpid(1)).into();
        assert!(matches!(err, StsError::Switch(_)));

        let err: StsError = ProcessError::AlreadyRunning("c1".to_string()).into();
        assert!(matches!(err, StsError::Process(_)));
    }

    #[test]
    fn test_sts_error_display() {
        let err: StsError = SwitchError::Failed(Dpid(9)).into();
        let msg = format!("{}", err);
        assert!(msg.contains("Switch error"));
        assert!(msg.contains("9"));
    }
}
