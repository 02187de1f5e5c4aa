//! Store mutation events and the blocking fan-out bus.
//!
//! Four event kinds exist: [`EventKind::EntityCreated`],
//! [`EventKind::EntityRemoved`], [`EventKind::ComponentAdded`] and
//! [`EventKind::ComponentRemoved`]. Each kind has its own subscriber map
//! keyed by [`SystemId`].
//!
//! ## Dispatch
//!
//! [`EventBus::dispatch`] runs every subscribed handler of the event's kind
//! on its own scoped thread and returns only once all of them have finished.
//! Handlers of one firing run in parallel with no ordering between them.
//! A handler that returns an error or panics does not abort the barrier: the
//! fault is captured into the returned [`DispatchReport`].
//!
//! The world only ever fires `EntityCreated` and `ComponentAdded`. The two
//! removal kinds are routed like any other so that handlers written against
//! the full contract keep working once something fires them.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use ecs_component::{AnyComponent, ComponentRef, ComponentStore, Entity};

use crate::error::{DispatchError, HandlerFailure, HandlerFault, SystemError};
use crate::system::SystemId;

/// The four notification channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// A new entity was created with its initial components.
    EntityCreated,
    /// An entity was removed.
    EntityRemoved,
    /// A component was added to an existing entity.
    ComponentAdded,
    /// A component was removed from an entity.
    ComponentRemoved,
}

impl EventKind {
    /// Every event kind, in channel order.
    pub const ALL: [EventKind; 4] = [
        EventKind::EntityCreated,
        EventKind::EntityRemoved,
        EventKind::ComponentAdded,
        EventKind::ComponentRemoved,
    ];

    const fn index(self) -> usize {
        match self {
            Self::EntityCreated => 0,
            Self::EntityRemoved => 1,
            Self::ComponentAdded => 2,
            Self::ComponentRemoved => 3,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EntityCreated => "entity-created",
            Self::EntityRemoved => "entity-removed",
            Self::ComponentAdded => "component-added",
            Self::ComponentRemoved => "component-removed",
        };
        f.write_str(name)
    }
}

/// A store mutation notification.
#[derive(Debug, Clone)]
pub enum Event {
    /// Fired once per new entity, after its components were written.
    EntityCreated {
        /// The new entity.
        entity: Entity,
        /// Every component the entity was created with.
        components: Vec<ComponentRef>,
    },
    /// An entity was removed.
    EntityRemoved {
        /// The removed entity.
        entity: Entity,
    },
    /// Fired before the component is written to the store.
    ComponentAdded {
        /// The entity gaining the component.
        entity: Entity,
        /// The value being added.
        component: ComponentRef,
    },
    /// A component was removed from an entity.
    ComponentRemoved {
        /// The entity losing the component.
        entity: Entity,
        /// The value being removed.
        component: ComponentRef,
    },
}

impl Event {
    /// Returns the channel this event is delivered on.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::EntityCreated { .. } => EventKind::EntityCreated,
            Self::EntityRemoved { .. } => EventKind::EntityRemoved,
            Self::ComponentAdded { .. } => EventKind::ComponentAdded,
            Self::ComponentRemoved { .. } => EventKind::ComponentRemoved,
        }
    }

    /// Returns the entity the event is about.
    #[must_use]
    pub fn entity(&self) -> Entity {
        match self {
            Self::EntityCreated { entity, .. }
            | Self::EntityRemoved { entity }
            | Self::ComponentAdded { entity, .. }
            | Self::ComponentRemoved { entity, .. } => *entity,
        }
    }
}

/// Receives store mutation events on behalf of one system.
///
/// Handlers are called concurrently with the handlers of other systems for
/// the same firing, so any state they mutate must be private to the system
/// and reachable through `&self`. Every method defaults to a no-op.
pub trait EventHandler: Send + Sync {
    /// A new entity was created. `store` already holds `components`.
    fn on_entity_created(
        &self,
        store: &ComponentStore,
        entity: Entity,
        components: &[ComponentRef],
    ) -> Result<(), SystemError> {
        let _ = (store, entity, components);
        Ok(())
    }

    /// An entity was removed.
    fn on_entity_removed(&self, store: &ComponentStore, entity: Entity) -> Result<(), SystemError> {
        let _ = (store, entity);
        Ok(())
    }

    /// A component is being added. `store` does not hold it yet.
    fn on_component_added(
        &self,
        store: &ComponentStore,
        entity: Entity,
        component: &dyn AnyComponent,
    ) -> Result<(), SystemError> {
        let _ = (store, entity, component);
        Ok(())
    }

    /// A component was removed.
    fn on_component_removed(
        &self,
        store: &ComponentStore,
        entity: Entity,
        component: &dyn AnyComponent,
    ) -> Result<(), SystemError> {
        let _ = (store, entity, component);
        Ok(())
    }
}

/// Route an event to the matching handler method.
fn deliver(
    handler: &dyn EventHandler,
    store: &ComponentStore,
    event: &Event,
) -> Result<(), SystemError> {
    match event {
        Event::EntityCreated { entity, components } => {
            handler.on_entity_created(store, *entity, components)
        }
        Event::EntityRemoved { entity } => handler.on_entity_removed(store, *entity),
        Event::ComponentAdded { entity, component } => {
            handler.on_component_added(store, *entity, component.as_ref())
        }
        Event::ComponentRemoved { entity, component } => {
            handler.on_component_removed(store, *entity, component.as_ref())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// The outcome of one [`EventBus::dispatch`] call.
#[derive(Debug)]
#[must_use]
pub struct DispatchReport {
    /// The kind of event that was dispatched.
    pub kind: EventKind,
    /// How many handlers received the event.
    pub handlers: usize,
    /// Handlers that returned an error or panicked.
    pub failures: Vec<HandlerFailure>,
}

impl DispatchReport {
    /// Returns `true` if every handler succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Convert into a `Result`, yielding the handler count on success.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] carrying every captured failure.
    pub fn into_result(self) -> Result<usize, DispatchError> {
        if self.failures.is_empty() {
            Ok(self.handlers)
        } else {
            Err(DispatchError {
                kind: self.kind,
                handlers: self.handlers,
                failures: self.failures,
            })
        }
    }
}

/// Handlers one system registered for one kind, in subscription order.
type Handlers = Vec<Arc<dyn EventHandler>>;

/// Per-kind subscriber maps with blocking parallel dispatch.
///
/// A system may hold several handlers per kind (one per membership set it
/// attaches); each of them receives every event of that kind.
#[derive(Default)]
pub struct EventBus {
    subscribers: [HashMap<SystemId, Handlers>; 4],
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            map.entry(&kind, &self.subscriber_count(kind));
        }
        map.finish()
    }
}

impl EventBus {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `handler` for `kind` under `system`, alongside any handlers the
    /// system already has for the kind.
    pub fn subscribe(&mut self, kind: EventKind, system: SystemId, handler: Arc<dyn EventHandler>) {
        self.subscribers[kind.index()]
            .entry(system)
            .or_default()
            .push(handler);
    }

    /// Add `handler` for every event kind under `system`.
    pub fn subscribe_all(&mut self, system: SystemId, handler: Arc<dyn EventHandler>) {
        for kind in EventKind::ALL {
            self.subscribe(kind, system, Arc::clone(&handler));
        }
    }

    /// Drop every handler registered under `system`.
    ///
    /// Returns the number of handlers removed.
    pub fn unsubscribe_all(&mut self, system: SystemId) -> usize {
        self.subscribers
            .iter_mut()
            .filter_map(|handlers| handlers.remove(&system))
            .map(|removed| removed.len())
            .sum()
    }

    /// Returns `true` if `system` has a handler for `kind`.
    #[must_use]
    pub fn is_subscribed(&self, kind: EventKind, system: SystemId) -> bool {
        self.subscribers[kind.index()]
            .get(&system)
            .is_some_and(|handlers| !handlers.is_empty())
    }

    /// Returns the number of handlers registered for `kind`, across all
    /// systems.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers[kind.index()].values().map(Vec::len).sum()
    }

    /// Deliver `event` to every handler of its kind and wait for all of them.
    ///
    /// Each handler runs on its own scoped thread with shared read access to
    /// `store`. Failures are collected, never propagated.
    pub fn dispatch(&self, store: &ComponentStore, event: &Event) -> DispatchReport {
        let kind = event.kind();
        let handlers: Vec<(SystemId, &Arc<dyn EventHandler>)> = self.subscribers[kind.index()]
            .iter()
            .flat_map(|(&system, handlers)| handlers.iter().map(move |h| (system, h)))
            .collect();

        debug!(
            kind = %kind,
            entity = %event.entity(),
            handlers = handlers.len(),
            "dispatching event"
        );

        let failures: Vec<HandlerFailure> = thread::scope(|scope| {
            let tasks: Vec<_> = handlers
                .iter()
                .map(|&(system, handler)| {
                    let task = scope.spawn(move || deliver(handler.as_ref(), store, event));
                    (system, task)
                })
                .collect();

            tasks
                .into_iter()
                .filter_map(|(system, task)| {
                    let fault = match task.join() {
                        Ok(Ok(())) => return None,
                        Ok(Err(err)) => HandlerFault::Error(err),
                        Err(payload) => HandlerFault::Panic(panic_message(payload.as_ref())),
                    };
                    warn!(kind = %kind, system = %system, %fault, "event handler failed");
                    Some(HandlerFailure { system, fault })
                })
                .collect()
        });

        DispatchReport {
            kind,
            handlers: handlers.len(),
            failures,
        }
    }
}
