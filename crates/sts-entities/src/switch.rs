//! Fault-injectable switch
//!
//! [`FuzzSwitch`] wraps an external protocol engine. The engine owns the
//! OpenFlow state machine and port table; the wrapper owns the controller
//! connections, can drop dead with [`fail`](FuzzSwitch::fail) and come back
//! with [`recover`](FuzzSwitch::recover), and publishes a control-plane event
//! for every message it sends or handles.
//!
//! Invariant: a failed switch holds no connections.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use sts_core::{
    ConfigError, ConnectionFactory, ControllerConnection, ControllerInfo, CpMessageEvent, Dpid,
    Emitter, ErrorHandler, EventBus, EventKind, EventSource, IoWorker, OfpMessage, PhyPort,
    PortTable, StsResult, SwitchEngine, SwitchError,
};
use sts_logging::EntityContextGuard;
use tracing::{debug, error, info, instrument, warn};

use crate::shim::{HandlerLayer, ShimDispatch};
use crate::snapshot::SwitchSnapshot;

/// Event kinds a switch may raise
pub const SWITCH_EVENTS: &[EventKind] = &[EventKind::ControlPlaneMessage];

/// A switch that can simulate dropping dead
pub struct FuzzSwitch<E: SwitchEngine> {
    dpid: Dpid,
    name: String,
    engine: E,
    factory: Arc<dyn ConnectionFactory<E::Worker>>,
    failed: bool,
    /// Controller peer address -> connection
    connections: BTreeMap<SocketAddr, Arc<E::Connection>>,
    controller_info: Vec<ControllerInfo>,
    error_handler: ErrorHandler,
    emitter: Emitter,
}

impl<E: SwitchEngine> fmt::Debug for FuzzSwitch<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuzzSwitch")
            .field("dpid", &self.dpid)
            .field("name", &self.name)
            .field("failed", &self.failed)
            .field("connections", &self.connections.keys().collect::<Vec<_>>())
            .field("controller_info", &self.controller_info)
            .finish()
    }
}

impl<E: SwitchEngine> FuzzSwitch<E> {
    /// Wrap `engine`, installing the interception shim on its handlers
    pub fn new(
        engine: E,
        factory: Arc<dyn ConnectionFactory<E::Worker>>,
        bus: &EventBus,
    ) -> Self {
        Self::with_handler_layers(engine, factory, bus, Vec::new())
    }

    /// Like [`FuzzSwitch::new`], stacking `layers` around the interception shim
    pub fn with_handler_layers(
        mut engine: E,
        factory: Arc<dyn ConnectionFactory<E::Worker>>,
        bus: &EventBus,
        layers: Vec<HandlerLayer<E::Connection>>,
    ) -> Self {
        let dpid = engine.dpid();
        let emitter = bus.emitter(EventSource::Switch(dpid), SWITCH_EVENTS);

        let shim = ShimDispatch::new(dpid, emitter.clone()).with_layers(layers);
        let handlers = engine.take_handlers();
        engine.install_handlers(shim.wrap_all(handlers));

        let error_handler: ErrorHandler = Arc::new(move |err| {
            error!(%dpid, error = %err, "Controller connection error");
            Err(err)
        });

        Self {
            dpid,
            name: format!("s{}", dpid),
            engine,
            factory,
            failed: false,
            connections: BTreeMap::new(),
            controller_info: Vec::new(),
            error_handler,
            emitter,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn dpid(&self) -> Dpid {
        self.dpid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Controllers this switch connects to, in registration order
    pub fn controller_info(&self) -> &[ControllerInfo] {
        &self.controller_info
    }

    /// Peer addresses of the live connections
    pub fn connection_peers(&self) -> Vec<SocketAddr> {
        self.connections.keys().copied().collect()
    }

    /// Register a controller to connect to on the next `connect()`
    pub fn add_controller_info(&mut self, info: ControllerInfo) {
        debug!(dpid = %self.dpid, controller = %info, "Added controller endpoint");
        self.controller_info.push(info);
    }

    /// Open one connection per registered controller
    ///
    /// Replaces any connections from an earlier call. If any endpoint cannot
    /// be reached the error is returned and the switch is left with no
    /// connections.
    #[instrument(skip(self), fields(dpid = %self.dpid))]
    pub fn connect(&mut self) -> StsResult<()> {
        if self.failed {
            return Err(SwitchError::Failed(self.dpid).into());
        }
        let _ctx = EntityContextGuard::new(self.emitter.source());
        self.establish()
    }

    fn establish(&mut self) -> StsResult<()> {
        self.disconnect_all();

        let mut fresh = BTreeMap::new();
        for info in &self.controller_info {
            let worker = match self.factory.create_io_worker(self.dpid, info) {
                Ok(worker) => worker,
                Err(e) => {
                    warn!(controller = %info, error = %e, "Failed to reach controller");
                    for connection in fresh.values() {
                        close(&mut self.engine, connection);
                    }
                    return Err(e.into());
                }
            };

            let peer = worker.peer_addr();
            let connection = self.engine.set_io_worker(worker);
            connection.set_error_handler(self.error_handler.clone());
            debug!(%peer, "Controller connection up");
            if let Some(stale) = fresh.insert(peer, connection) {
                close(&mut self.engine, &stale);
            }
        }

        info!(connections = fresh.len(), "Connected to controllers");
        self.connections = fresh;
        Ok(())
    }

    /// Close and forget every connection the switch or its engine holds
    fn disconnect_all(&mut self) {
        for connection in self.engine.connections() {
            connection.close();
        }
        for connection in self.connections.values() {
            connection.close();
        }
        self.engine.clear_connections();
        self.connections.clear();
    }

    /// Look up the connection to a controller by its peer address
    pub fn get_connection(&self, peer: SocketAddr) -> Result<&Arc<E::Connection>, ConfigError> {
        self.connections
            .get(&peer)
            .ok_or(ConfigError::ConnectionNotFound {
                dpid: self.dpid,
                peer,
            })
    }

    /// Simulate a control-plane crash
    ///
    /// Ports and flow tables are kept. Failing a failed switch only warns.
    pub fn fail(&mut self) {
        let _ctx = EntityContextGuard::new(self.emitter.source());
        if self.failed {
            warn!(dpid = %self.dpid, "Switch already failed");
            return;
        }

        self.failed = true;
        let dropped = self.connections.len();
        self.disconnect_all();
        info!(dpid = %self.dpid, dropped, "Switch failed");
    }

    /// Bring a failed switch back, reconnecting to every controller
    ///
    /// Recovering a live switch only warns. If reconnecting fails the switch
    /// stays failed.
    pub fn recover(&mut self) -> StsResult<()> {
        let _ctx = EntityContextGuard::new(self.emitter.source());
        if !self.failed {
            warn!(dpid = %self.dpid, "Switch already up");
            return Ok(());
        }

        self.establish()?;
        self.failed = false;
        info!(dpid = %self.dpid, "Switch recovered");
        Ok(())
    }

    /// Send a message to the controller(s) the engine picks
    ///
    /// The outbound event is published only once the engine has committed
    /// the message. Returns the peers it went to.
    pub fn send(&mut self, message: &OfpMessage) -> StsResult<Vec<SocketAddr>> {
        let used = self.engine.send(message)?;
        let peers: Vec<SocketAddr> = used.iter().map(|c| c.peer_addr()).collect();
        self.emitter
            .emit(CpMessageEvent::outbound(self.dpid, peers.clone(), message.clone()))?;
        Ok(peers)
    }

    /// Hand an inbound message from `peer` to the engine's handlers
    pub fn receive(&self, peer: SocketAddr, message: &OfpMessage) -> StsResult<()> {
        let connection = self.get_connection(peer)?.clone();
        self.engine.dispatch(&connection, message)
    }

    pub fn snapshot(&self) -> SwitchSnapshot {
        SwitchSnapshot {
            dpid: self.dpid,
            parent_controller: self.engine.parent_controller_name(),
            ports: self.engine.ports().values().cloned().collect(),
        }
    }

    /// Encoded [`SwitchSnapshot`], for out-of-band inspection
    pub fn serialize(&self) -> StsResult<Vec<u8>> {
        self.snapshot().to_bytes()
    }
}

fn close<E: SwitchEngine>(engine: &mut E, connection: &Arc<E::Connection>) {
    connection.close();
    engine.drop_connection(connection);
}

impl<E: SwitchEngine> PortTable for FuzzSwitch<E> {
    fn dpid(&self) -> Dpid {
        self.dpid
    }

    fn ports(&self) -> &BTreeMap<u16, PhyPort> {
        self.engine.ports()
    }
}

impl<E: SwitchEngine> fmt::Display for FuzzSwitch<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.dpid)
    }
}
