//! Mock protocol engine for testing
//!
//! Provides an in-memory [`SwitchEngine`] so switch lifecycle, connection
//! routing and message interception can be exercised without an OpenFlow
//! implementation or real controllers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sts_core::{Dpid, MockConnectionFactory, MockEngine, OfpType};
//!
//! let engine = MockEngine::new(Dpid(1), 4)
//!     .with_handler(OfpType::EchoRequest, |conn, msg| {
//!         conn.write(OfpMessage::header_only(OfpType::EchoReply, msg.xid))
//!     });
//! let factory = MockConnectionFactory::new();
//! ```

use std::collections::{BTreeMap, HashSet};
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::config::ControllerInfo;
use crate::engine::{
    ConnectionFactory, ControllerConnection, ErrorHandler, HandlerTable, IoWorker,
    MessageHandler, SwitchEngine,
};
use crate::error::{ProtocolError, StsResult, TransportError};
use crate::identity::Dpid;
use crate::message::{OfpMessage, OfpType};
use crate::port::{PhyPort, PortTable, numbered_ports};

/// I/O worker that only knows its peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockIoWorker {
    peer: SocketAddr,
}

impl MockIoWorker {
    pub fn new(peer: SocketAddr) -> Self {
        Self { peer }
    }
}

impl IoWorker for MockIoWorker {
    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

/// In-memory controller connection
///
/// Records every message written to it and routes injected errors through
/// the installed error handler.
pub struct MockConnection {
    peer: SocketAddr,
    closed: AtomicBool,
    sent: Mutex<Vec<OfpMessage>>,
    error_handler: Mutex<Option<ErrorHandler>>,
    /// Keeps the underlying transport open until the connection closes
    worker: Mutex<Option<Box<dyn IoWorker>>>,
}

impl std::fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnection")
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .field("sent", &self.sent.lock().len())
            .finish()
    }
}

impl MockConnection {
    pub fn new(worker: Box<dyn IoWorker>) -> Self {
        Self {
            peer: worker.peer_addr(),
            closed: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            error_handler: Mutex::new(None),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Put a message on the wire
    pub fn write(&self, message: OfpMessage) -> StsResult<()> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed.into());
        }
        self.sent.lock().push(message);
        Ok(())
    }

    /// Messages written so far
    pub fn sent_messages(&self) -> Vec<OfpMessage> {
        self.sent.lock().clone()
    }

    pub fn has_error_handler(&self) -> bool {
        self.error_handler.lock().is_some()
    }

    /// Surface a transport error as the I/O layer would
    ///
    /// Without a handler the error is returned unchanged.
    pub fn raise_error(&self, error: TransportError) -> Result<(), TransportError> {
        let handler = self.error_handler.lock().clone();
        match handler {
            Some(handler) => handler(error),
            None => Err(error),
        }
    }
}

impl ControllerConnection for MockConnection {
    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn set_error_handler(&self, handler: ErrorHandler) {
        *self.error_handler.lock() = Some(handler);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.worker.lock().take();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// In-memory protocol engine
///
/// `send` writes to every open connection, the way a switch without a
/// master/slave role configuration talks to all of its controllers.
pub struct MockEngine<W = MockIoWorker> {
    dpid: Dpid,
    ports: BTreeMap<u16, PhyPort>,
    parent_controller: Option<String>,
    handlers: HandlerTable<MockConnection>,
    connections: Vec<Arc<MockConnection>>,
    _worker: PhantomData<fn(W)>,
}

impl<W: IoWorker> MockEngine<W> {
    /// Engine with `port_count` ports numbered from 1 and no handlers
    pub fn new(dpid: Dpid, port_count: u16) -> Self {
        Self {
            dpid,
            ports: numbered_ports(dpid, port_count),
            parent_controller: None,
            handlers: BTreeMap::new(),
            connections: Vec::new(),
            _worker: PhantomData,
        }
    }

    /// Register an inbound handler
    pub fn with_handler<F>(mut self, msg_type: OfpType, handler: F) -> Self
    where
        F: Fn(&Arc<MockConnection>, &OfpMessage) -> StsResult<()> + Send + Sync + 'static,
    {
        let handler: MessageHandler<MockConnection> = Arc::new(handler);
        self.handlers.insert(msg_type, handler);
        self
    }

    pub fn with_parent_controller(mut self, name: impl Into<String>) -> Self {
        self.parent_controller = Some(name.into());
        self
    }

    /// Registered handler types
    pub fn handler_types(&self) -> Vec<OfpType> {
        self.handlers.keys().copied().collect()
    }
}

impl<W> PortTable for MockEngine<W> {
    fn dpid(&self) -> Dpid {
        self.dpid
    }

    fn ports(&self) -> &BTreeMap<u16, PhyPort> {
        &self.ports
    }
}

impl<W: IoWorker> SwitchEngine for MockEngine<W> {
    type Worker = W;
    type Connection = MockConnection;

    fn parent_controller_name(&self) -> Option<String> {
        self.parent_controller.clone()
    }

    fn take_handlers(&mut self) -> HandlerTable<MockConnection> {
        std::mem::take(&mut self.handlers)
    }

    fn install_handlers(&mut self, handlers: HandlerTable<MockConnection>) {
        self.handlers.extend(handlers);
    }

    fn set_io_worker(&mut self, worker: W) -> Arc<MockConnection> {
        let connection = Arc::new(MockConnection::new(Box::new(worker)));
        self.connections.push(connection.clone());
        connection
    }

    fn connections(&self) -> Vec<Arc<MockConnection>> {
        self.connections.clone()
    }

    fn drop_connection(&mut self, connection: &Arc<MockConnection>) {
        self.connections.retain(|c| !Arc::ptr_eq(c, connection));
    }

    fn clear_connections(&mut self) {
        self.connections.clear();
    }

    fn send(&mut self, message: &OfpMessage) -> StsResult<Vec<Arc<MockConnection>>> {
        let open: Vec<Arc<MockConnection>> = self
            .connections
            .iter()
            .filter(|c| !c.is_closed())
            .cloned()
            .collect();
        if open.is_empty() {
            return Err(TransportError::NotConnected(self.dpid).into());
        }
        for connection in &open {
            connection.write(message.clone())?;
        }
        Ok(open)
    }

    fn dispatch(&self, connection: &Arc<MockConnection>, message: &OfpMessage) -> StsResult<()> {
        let handler = self
            .handlers
            .get(&message.msg_type)
            .ok_or(ProtocolError::NoHandler(message.msg_type))?;
        handler(connection, message)
    }
}

/// Connection factory for mock endpoints
///
/// Every endpoint is reachable unless refused with [`refuse`](Self::refuse).
#[derive(Debug, Default)]
pub struct MockConnectionFactory {
    refused: Mutex<HashSet<SocketAddr>>,
    opened: AtomicUsize,
}

impl MockConnectionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make connection attempts to `addr` fail
    pub fn refuse(&self, addr: SocketAddr) {
        self.refused.lock().insert(addr);
    }

    /// Make `addr` reachable again
    pub fn accept(&self, addr: SocketAddr) {
        self.refused.lock().remove(&addr);
    }

    /// Number of workers created so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl ConnectionFactory<MockIoWorker> for MockConnectionFactory {
    fn create_io_worker(
        &self,
        dpid: Dpid,
        info: &ControllerInfo,
    ) -> Result<MockIoWorker, TransportError> {
        let addr = info.socket_addr();
        if self.refused.lock().contains(&addr) {
            return Err(TransportError::ConnectionFailed(format!(
                "switch {} refused by {}",
                dpid, addr
            )));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockIoWorker::new(addr))
    }
}
