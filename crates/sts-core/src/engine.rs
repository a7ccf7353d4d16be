//! Collaborator traits for the switch protocol engine
//!
//! The entity layer wraps an external OpenFlow switch engine and delegates
//! all protocol behaviour to it. [`SwitchEngine`] is everything the wrapper
//! needs from that engine:
//!
//! - a port table ([`PortTable`])
//! - a handler registration API it can wrap before installing
//! - a `send` primitive reporting which connections carried the message
//! - a hookpoint that turns a freshly opened I/O worker into a connection
//!
//! Inbound handlers always receive the connection the message arrived on and
//! the message itself; that contract is part of [`MessageHandler`]'s type.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::ControllerInfo;
use crate::error::{StsResult, TransportError};
use crate::identity::Dpid;
use crate::message::{OfpMessage, OfpType};
use crate::port::PortTable;

/// Inbound message handler bound to one message type
pub type MessageHandler<C> = Arc<dyn Fn(&Arc<C>, &OfpMessage) -> StsResult<()> + Send + Sync>;

/// Handler registry of an engine, keyed by message type
pub type HandlerTable<C> = BTreeMap<OfpType, MessageHandler<C>>;

/// Called with errors surfaced on an established connection
///
/// Returning the error re-raises it to whoever drives the connection.
pub type ErrorHandler = Arc<dyn Fn(TransportError) -> Result<(), TransportError> + Send + Sync>;

/// Low-level I/O worker bound to one controller endpoint
pub trait IoWorker: Send + 'static {
    /// Remote address of the controller this worker talks to
    fn peer_addr(&self) -> SocketAddr;
}

/// An established switch-to-controller connection owned by the engine
pub trait ControllerConnection: Send + Sync + 'static {
    /// Remote address of the controller, used as the connection's identity
    fn peer_addr(&self) -> SocketAddr;

    /// Install the handler for errors surfaced later on this connection
    fn set_error_handler(&self, handler: ErrorHandler);

    /// Close the connection. Closing twice is harmless.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// The external OpenFlow switch engine
pub trait SwitchEngine: PortTable + Send {
    type Worker: IoWorker;
    type Connection: ControllerConnection;

    /// Name of the controller that owns this switch, if any
    fn parent_controller_name(&self) -> Option<String>;

    /// Remove and return the registered inbound handlers
    fn take_handlers(&mut self) -> HandlerTable<Self::Connection>;

    /// Register inbound handlers, replacing any with the same message type
    fn install_handlers(&mut self, handlers: HandlerTable<Self::Connection>);

    /// Transport-up hookpoint: wrap a worker into a live connection
    fn set_io_worker(&mut self, worker: Self::Worker) -> Arc<Self::Connection>;

    /// All connections the engine currently holds
    fn connections(&self) -> Vec<Arc<Self::Connection>>;

    /// Forget a single connection, matched by identity
    fn drop_connection(&mut self, connection: &Arc<Self::Connection>);

    /// Forget every connection
    fn clear_connections(&mut self);

    /// Send a message to the controller(s) of the engine's choosing
    ///
    /// Returns the connections the message was committed to.
    fn send(&mut self, message: &OfpMessage) -> StsResult<Vec<Arc<Self::Connection>>>;

    /// Run the registered handler for an inbound message
    fn dispatch(&self, connection: &Arc<Self::Connection>, message: &OfpMessage)
    -> StsResult<()>;
}

/// Opens transports to controller endpoints
pub trait ConnectionFactory<W: IoWorker>: Send + Sync {
    fn create_io_worker(&self, dpid: Dpid, info: &ControllerInfo) -> Result<W, TransportError>;
}
