//! Entity context injection for multi-entity logging
//!
//! A harness run drives many switches, hosts and controller processes from
//! one thread. The guard here names the entity currently being operated on
//! and opens a span for it, so log records from that scope carry the name.

use std::cell::RefCell;
use std::fmt;

use sts_core::EventSource;
use tracing::info_span;
use tracing::span::EnteredSpan;
use uuid::Uuid;

/// Entity context data stored in thread-local storage
#[derive(Debug, Clone)]
pub struct EntityContextData {
    /// Human-readable entity name (`switch 7`, `host h1`, `controller c0`)
    pub entity: String,
    /// What sort of entity this is
    pub kind: EntityKind,
    /// Unique instance ID for this scope
    pub instance_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Switch,
    Host,
    Controller,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Switch => write!(f, "switch"),
            EntityKind::Host => write!(f, "host"),
            EntityKind::Controller => write!(f, "controller"),
        }
    }
}

thread_local! {
    static ENTITY_CONTEXT: RefCell<Option<EntityContextData>> = const { RefCell::new(None) };
}

/// RAII guard for entity context
///
/// Creating the guard sets the entity context for the current thread and
/// enters an `entity` span carrying it, so every record logged in the scope
/// names the entity. Dropping it restores whatever was set before.
///
/// The guard must not be held across an `.await`.
///
/// ```
/// use sts_core::{Dpid, EventSource};
/// use sts_logging::EntityContextGuard;
///
/// let _guard = EntityContextGuard::new(&EventSource::Switch(Dpid(7)));
/// assert_eq!(EntityContextGuard::current_entity().as_deref(), Some("switch 7"));
/// ```
pub struct EntityContextGuard {
    previous: Option<EntityContextData>,
    _span: EnteredSpan,
}

impl EntityContextGuard {
    /// Scope logs to a switch or host
    pub fn new(source: &EventSource) -> Self {
        Self::with_instance_id(source, Uuid::new_v4())
    }

    /// Scope logs to a controller process, by label
    pub fn controller(label: &str) -> Self {
        Self::install(EntityContextData {
            entity: format!("controller {}", label),
            kind: EntityKind::Controller,
            instance_id: Uuid::new_v4(),
        })
    }

    /// Like [`EntityContextGuard::new`] but with a caller-chosen instance ID
    pub fn with_instance_id(source: &EventSource, instance_id: Uuid) -> Self {
        let kind = match source {
            EventSource::Switch(_) => EntityKind::Switch,
            EventSource::Host(_) => EntityKind::Host,
        };
        Self::install(EntityContextData {
            entity: source.to_string(),
            kind,
            instance_id,
        })
    }

    fn install(data: EntityContextData) -> Self {
        let span = info_span!(
            "entity",
            entity = %data.entity,
            kind = %data.kind,
            instance_id = %data.instance_id
        )
        .entered();
        let previous = ENTITY_CONTEXT.with(|ctx| ctx.borrow_mut().replace(data));
        Self {
            previous,
            _span: span,
        }
    }

    /// Get the current entity context (if any)
    pub fn current() -> Option<EntityContextData> {
        ENTITY_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    pub fn current_entity() -> Option<String> {
        Self::current().map(|ctx| ctx.entity)
    }

    pub fn current_instance_id() -> Option<Uuid> {
        Self::current().map(|ctx| ctx.instance_id)
    }
}

impl Drop for EntityContextGuard {
    fn drop(&mut self) {
        ENTITY_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}

/// Run a block with the entity context set
///
/// ```ignore
/// with_entity_context!(&EventSource::Host("h1".into()), {
///     tracing::info!("Sending packet");
/// });
/// ```
#[macro_export]
macro_rules! with_entity_context {
    ($source:expr, $body:block) => {{
        let _guard = $crate::context::EntityContextGuard::new($source);
        $body
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use sts_core::Dpid;

    #[test]
    fn test_entity_context_guard() {
        assert!(EntityContextGuard::current().is_none());

        {
            let _guard = EntityContextGuard::new(&EventSource::Switch(Dpid(3)));
            let ctx = EntityContextGuard::current().unwrap();
            assert_eq!(ctx.entity, "switch 3");
            assert_eq!(ctx.kind, EntityKind::Switch);
        }

        assert!(EntityContextGuard::current().is_none());
    }

    #[test]
    fn test_nested_contexts() {
        let host = EventSource::Host("h1".to_string());

        {
            let _outer = EntityContextGuard::new(&host);
            assert_eq!(
                EntityContextGuard::current_entity(),
                Some("host h1".to_string())
            );

            {
                let _inner = EntityContextGuard::controller("c0");
                let ctx = EntityContextGuard::current().unwrap();
                assert_eq!(ctx.entity, "controller c0");
                assert_eq!(ctx.kind, EntityKind::Controller);
            }

            // Restored after the inner guard drops
            assert_eq!(
                EntityContextGuard::current_entity(),
                Some("host h1".to_string())
            );
        }

        assert!(EntityContextGuard::current_entity().is_none());
    }

    #[test]
    fn test_with_instance_id() {
        let instance_id = Uuid::new_v4();
        let _guard =
            EntityContextGuard::with_instance_id(&EventSource::Switch(Dpid(1)), instance_id);
        assert_eq!(EntityContextGuard::current_instance_id(), Some(instance_id));
    }

    #[test]
    fn test_macro_scopes_context() {
        let seen = with_entity_context!(&EventSource::Host("h2".to_string()), {
            EntityContextGuard::current_entity()
        });
        assert_eq!(seen.as_deref(), Some("host h2"));
        assert!(EntityContextGuard::current().is_none());
    }
}
