//! TCP transport to real controllers
//!
//! Connecting blocks the caller until the controller accepts or the
//! optional timeout expires; the switch's `connect()` is allowed to block.

use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use tracing::debug;

use crate::config::ControllerInfo;
use crate::engine::{ConnectionFactory, IoWorker};
use crate::error::TransportError;
use crate::identity::Dpid;

/// An open TCP stream to a controller
#[derive(Debug)]
pub struct TcpIoWorker {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpIoWorker {
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub fn into_stream(self) -> TcpStream {
        self.stream
    }
}

impl IoWorker for TcpIoWorker {
    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

/// Opens one TCP connection per controller endpoint
#[derive(Debug, Clone)]
pub struct TcpConnectionFactory {
    connect_timeout: Option<Duration>,
    nodelay: bool,
}

impl TcpConnectionFactory {
    pub fn new() -> Self {
        Self {
            connect_timeout: None,
            nodelay: true,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

impl Default for TcpConnectionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionFactory<TcpIoWorker> for TcpConnectionFactory {
    fn create_io_worker(
        &self,
        dpid: Dpid,
        info: &ControllerInfo,
    ) -> Result<TcpIoWorker, TransportError> {
        let addr = info.socket_addr();
        let stream = match self.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        }
        .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", addr, e)))?;

        stream
            .set_nodelay(self.nodelay)
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", addr, e)))?;
        let peer = stream
            .peer_addr()
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", addr, e)))?;

        debug!(%dpid, %peer, "Opened controller transport");
        Ok(TcpIoWorker { stream, peer })
    }
}
