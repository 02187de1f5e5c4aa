//! Registration-time context handed to [`System::init`](crate::System::init).

use std::sync::Arc;

use ecs_component::ComponentStore;

use crate::event::{EventHandler, EventKind};
use crate::shutdown::ShutdownSignal;
use crate::system::SystemId;
use crate::world::World;

/// Context provided to a system while it is being registered.
///
/// Gives the system its id, the world to backfill from, the event bus to
/// subscribe on, and the shutdown signal to poll. Subscriptions made here are
/// keyed by the system's id and are rolled back if `init` fails.
#[derive(Debug)]
pub struct InitContext<'w> {
    id: SystemId,
    world: &'w mut World,
    shutdown: &'w ShutdownSignal,
}

impl<'w> InitContext<'w> {
    /// Create a context for the system being registered as `id`.
    #[must_use]
    pub fn new(id: SystemId, world: &'w mut World, shutdown: &'w ShutdownSignal) -> Self {
        Self {
            id,
            world,
            shutdown,
        }
    }

    /// The id the system is being registered under.
    #[must_use]
    pub fn id(&self) -> SystemId {
        self.id
    }

    /// Read access to the current component store.
    #[must_use]
    pub fn store(&self) -> &ComponentStore {
        self.world.store()
    }

    /// Full access to the world, e.g. to seed entities during `init`.
    pub fn world_mut(&mut self) -> &mut World {
        self.world
    }

    /// The run's shutdown signal.
    #[must_use]
    pub fn shutdown(&self) -> &ShutdownSignal {
        self.shutdown
    }

    /// Subscribe `handler` to `kind` under this system's id. Earlier
    /// handlers of the same system stay subscribed.
    pub fn subscribe(&mut self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        self.world.bus_mut().subscribe(kind, self.id, handler);
    }

    /// Subscribe `handler` to every event kind under this system's id.
    pub fn subscribe_all(&mut self, handler: Arc<dyn EventHandler>) {
        self.world.bus_mut().subscribe_all(self.id, handler);
    }
}
