//! Synchronous publish/subscribe for entity events
//!
//! Observers subscribe per [`EventKind`] and are called on the publishing
//! call stack, in publication order. Delivery is non-reentrant: an event
//! published while another is being delivered (for example by an observer
//! that pokes another entity) is queued and delivered by the outer delivery
//! loop once the current callbacks return.
//!
//! [`EventBus::defer`] opens a buffering scope. Nothing is delivered while a
//! scope is open; on release the held events are delivered in order, and
//! [`DeferGuard::release_with`] puts one event ahead of everything the scope
//! held. The switch shim uses this so that "message handled" is observed
//! before anything the handler itself caused.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sts_core::{EventBus, EventKind};
//!
//! let bus = EventBus::new();
//! bus.on_control_plane(|event| println!("{} {}", event.direction, event.message));
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::EventError;
use crate::event::{CpMessageEvent, DpPacketOutEvent, Event, EventKind, EventSource};

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    kind: EventKind,
    callback: Callback,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    subscribers: Vec<Subscriber>,
    queue: VecDeque<Event>,
    /// Number of open defer scopes
    holds: usize,
    /// A delivery loop is running further up some call stack
    dispatching: bool,
}

/// In-process event bus shared by all entities of a simulation
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusState>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("EventBus")
            .field("subscribers", &state.subscribers.len())
            .field("queued", &state.queue.len())
            .field("holds", &state.holds)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every event of `kind`
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut state = self.inner.lock();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.subscribers.push(Subscriber {
            id,
            kind,
            callback: Arc::new(callback),
        });
        id
    }

    /// Subscribe to control-plane message events
    pub fn on_control_plane<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&CpMessageEvent) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::ControlPlaneMessage, move |event| {
            if let Event::ControlPlane(e) = event {
                callback(e);
            }
        })
    }

    /// Subscribe to data-plane packet-out events
    pub fn on_data_plane<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DpPacketOutEvent) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::DataPlanePacketOut, move |event| {
            if let Event::DataPlane(e) = event {
                callback(e);
            }
        })
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.inner.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|s| s.id != id);
        state.subscribers.len() != before
    }

    /// Number of subscribers for a kind
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.inner
            .lock()
            .subscribers
            .iter()
            .filter(|s| s.kind == kind)
            .count()
    }

    /// Events published but not yet delivered
    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Create an emitter for an entity that may raise only `kinds`
    pub fn emitter(&self, source: EventSource, kinds: &'static [EventKind]) -> Emitter {
        Emitter {
            bus: self.clone(),
            source,
            kinds,
        }
    }

    /// Hold delivery until the returned guard is dropped or released
    pub fn defer(&self) -> DeferGuard {
        let mut state = self.inner.lock();
        state.holds += 1;
        DeferGuard {
            bus: self.clone(),
            mark: state.queue.len(),
            first: None,
        }
    }

    fn publish(&self, event: Event) {
        {
            let mut state = self.inner.lock();
            state.queue.push_back(event);
            if state.dispatching || state.holds > 0 {
                return;
            }
            state.dispatching = true;
        }
        self.drain();
    }

    fn release(&self, mark: usize, first: Option<Event>) {
        {
            let mut state = self.inner.lock();
            state.holds = state.holds.saturating_sub(1);
            if let Some(event) = first {
                let at = mark.min(state.queue.len());
                state.queue.insert(at, event);
            }
            if state.holds > 0 || state.dispatching || state.queue.is_empty() {
                return;
            }
            state.dispatching = true;
        }
        self.drain();
    }

    fn drain(&self) {
        let _reset = DispatchReset(self);
        loop {
            let (event, callbacks) = {
                let mut state = self.inner.lock();
                if state.holds > 0 {
                    state.dispatching = false;
                    return;
                }
                let Some(event) = state.queue.pop_front() else {
                    state.dispatching = false;
                    return;
                };
                let kind = event.kind();
                let callbacks: Vec<Callback> = state
                    .subscribers
                    .iter()
                    .filter(|s| s.kind == kind)
                    .map(|s| s.callback.clone())
                    .collect();
                (event, callbacks)
            };

            for callback in callbacks {
                callback(&event);
            }
        }
    }
}

/// Clears the dispatching flag if an observer panics mid-delivery
struct DispatchReset<'a>(&'a EventBus);

impl Drop for DispatchReset<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.inner.lock().dispatching = false;
        }
    }
}

/// Buffering scope opened by [`EventBus::defer`]
#[must_use = "events are held until the guard is dropped"]
pub struct DeferGuard {
    bus: EventBus,
    /// Queue length when the scope opened; held events sit after it
    mark: usize,
    first: Option<Event>,
}

impl DeferGuard {
    /// Close the scope, delivering `event` before everything held in it
    pub fn release_with(mut self, event: impl Into<Event>) {
        self.first = Some(event.into());
    }
}

impl Drop for DeferGuard {
    fn drop(&mut self) {
        self.bus.release(self.mark, self.first.take());
    }
}

/// An entity's handle to the bus
///
/// Carries the entity's identity and the closed list of event kinds it
/// declared when it was created.
#[derive(Clone)]
pub struct Emitter {
    bus: EventBus,
    source: EventSource,
    kinds: &'static [EventKind],
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("source", &self.source)
            .field("kinds", &self.kinds)
            .finish()
    }
}

impl Emitter {
    /// Publish an event of a declared kind
    pub fn emit(&self, event: impl Into<Event>) -> Result<(), EventError> {
        let event = event.into();
        self.check_declared(event.kind())?;
        self.bus.publish(event);
        Ok(())
    }

    /// Open a buffering scope on the underlying bus
    pub fn defer(&self) -> DeferGuard {
        self.bus.defer()
    }

    /// Close `guard`, delivering `event` ahead of everything it held
    ///
    /// An undeclared `event` is rejected; the scope is still released.
    pub fn release_with(&self, guard: DeferGuard, event: impl Into<Event>) -> Result<(), EventError> {
        let event = event.into();
        self.check_declared(event.kind())?;
        guard.release_with(event);
        Ok(())
    }

    fn check_declared(&self, kind: EventKind) -> Result<(), EventError> {
        if self.kinds.contains(&kind) {
            Ok(())
        } else {
            Err(EventError::UndeclaredKind {
                entity: self.source.clone(),
                kind,
            })
        }
    }

    pub fn source(&self) -> &EventSource {
        &self.source
    }

    pub fn declared_kinds(&self) -> &'static [EventKind] {
        self.kinds
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

/// Append-only record of observed events
///
/// Subscribes to the given kinds on creation and stays subscribed until
/// [`EventLog::detach`] is called.
#[derive(Clone)]
pub struct EventLog {
    bus: EventBus,
    events: Arc<Mutex<Vec<Event>>>,
    subscriptions: Vec<SubscriptionId>,
}

impl EventLog {
    pub fn attach(bus: &EventBus, kinds: &[EventKind]) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriptions = kinds
            .iter()
            .map(|kind| {
                let events = events.clone();
                bus.subscribe(*kind, move |event| events.lock().push(event.clone()))
            })
            .collect();
        Self {
            bus: bus.clone(),
            events,
            subscriptions,
        }
    }

    /// Record every kind of event
    pub fn attach_all(bus: &EventBus) -> Self {
        Self::attach(
            bus,
            &[EventKind::ControlPlaneMessage, EventKind::DataPlanePacketOut],
        )
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn control_plane(&self) -> Vec<CpMessageEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| e.as_control_plane().cloned())
            .collect()
    }

    pub fn data_plane(&self) -> Vec<DpPacketOutEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| e.as_data_plane().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Stop recording. Events already recorded are kept.
    pub fn detach(&self) {
        for id in &self.subscriptions {
            self.bus.unsubscribe(*id);
        }
    }
}
