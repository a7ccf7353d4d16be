//! Inbound message interception
//!
//! Every inbound handler a switch's engine registers is wrapped so that
//! handling a message also publishes a [`CpMessageEvent`]. The event is raised
//! after the original handler returns. Anything the handler itself publishes
//! (packet-outs, further sends) is held in a defer scope and delivered after
//! the interception event, so observers see a message being received before
//! its consequences.
//!
//! Extra [`HandlerLayer`]s can be stacked around the interception wrapper;
//! they are applied in order, the last one outermost.

use std::fmt;
use std::sync::Arc;

use sts_core::{
    ControllerConnection, CpMessageEvent, Dpid, Emitter, HandlerTable, MessageHandler, OfpType,
};
use tracing::{debug, trace};

/// A handler-wrapping function, applied when handlers are installed
pub type HandlerLayer<C> = Arc<dyn Fn(OfpType, MessageHandler<C>) -> MessageHandler<C> + Send + Sync>;

/// Builds the handler chain for one switch
pub struct ShimDispatch<C> {
    dpid: Dpid,
    emitter: Emitter,
    layers: Vec<HandlerLayer<C>>,
}

impl<C> fmt::Debug for ShimDispatch<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShimDispatch")
            .field("dpid", &self.dpid)
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl<C: ControllerConnection> ShimDispatch<C> {
    pub fn new(dpid: Dpid, emitter: Emitter) -> Self {
        Self {
            dpid,
            emitter,
            layers: Vec::new(),
        }
    }

    pub fn with_layers(mut self, layers: Vec<HandlerLayer<C>>) -> Self {
        self.layers = layers;
        self
    }

    /// Wrap a single handler: interception first, then each layer
    pub fn wrap(&self, msg_type: OfpType, handler: MessageHandler<C>) -> MessageHandler<C> {
        let wrapped = intercept(self.dpid, self.emitter.clone(), handler);
        self.layers
            .iter()
            .fold(wrapped, |inner, layer| layer(msg_type, inner))
    }

    /// Wrap every handler of an engine's table
    pub fn wrap_all(&self, handlers: HandlerTable<C>) -> HandlerTable<C> {
        debug!(dpid = %self.dpid, handlers = handlers.len(), "Installing interception shim");
        handlers
            .into_iter()
            .map(|(msg_type, handler)| (msg_type, self.wrap(msg_type, handler)))
            .collect()
    }
}

/// Run `handler`, then publish the inbound event ahead of whatever the
/// handler published
///
/// A failed handler raises no interception event; events it published are
/// still delivered and the error is returned unchanged.
pub fn intercept<C: ControllerConnection>(
    dpid: Dpid,
    emitter: Emitter,
    handler: MessageHandler<C>,
) -> MessageHandler<C> {
    Arc::new(move |connection, message| {
        let held = emitter.defer();
        handler(connection, message)?;

        trace!(%dpid, peer = %connection.peer_addr(), %message, "Intercepted inbound message");
        emitter.release_with(
            held,
            CpMessageEvent::inbound(dpid, connection.peer_addr(), message.clone()),
        )?;
        Ok(())
    })
}
