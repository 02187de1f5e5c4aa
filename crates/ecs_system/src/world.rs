//! World state: entity allocation, component storage and the event bus.
//!
//! The [`World`] is the only place store mutations are announced. Every
//! firing goes through [`EventBus::dispatch`], so each mutating call blocks
//! until every subscribed handler has observed the change.

use std::sync::Arc;

use tracing::debug;

use ecs_component::{
    AnyComponent, Component, ComponentName, ComponentRef, ComponentStore, Entity, EntityAllocator,
};

use crate::error::WorldError;
use crate::event::{DispatchReport, Event, EventBus};

/// Entity allocation, component storage and event fan-out.
#[derive(Debug, Default)]
pub struct World {
    /// Entity ID allocator.
    allocator: EntityAllocator,
    /// Per-kind component storage.
    store: ComponentStore,
    /// Subscribers notified of store mutations.
    bus: EventBus,
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the component store.
    #[must_use]
    pub fn store(&self) -> &ComponentStore {
        &self.store
    }

    /// Read access to the event bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Mutable access to the event bus, for subscribing.
    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Returns `true` if `entity` was created by this world.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.allocator.is_allocated(entity)
    }

    /// Returns the number of entities created so far.
    #[must_use]
    pub fn entity_count(&self) -> u64 {
        self.allocator.count()
    }

    /// Create the store submap for `component`'s kind if needed.
    ///
    /// Returns `true` if the submap was newly created.
    pub fn register_component(&mut self, component: &dyn AnyComponent) -> bool {
        self.store.register_component(component)
    }

    /// Create a new entity holding `components`.
    ///
    /// The components are written straight into the store without
    /// per-component events; exactly one `EntityCreated` event carrying the
    /// full list is fired afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Store`] if entity IDs are exhausted, or
    /// [`WorldError::Dispatch`] if a handler failed. In the latter case the
    /// entity exists and is named in the error.
    pub fn new_entity(&mut self, components: Vec<ComponentRef>) -> Result<Entity, WorldError> {
        let entity = self.allocator.allocate()?;
        for component in &components {
            self.store.insert(entity, Arc::clone(component));
        }
        debug!(%entity, components = components.len(), "created entity");

        let event = Event::EntityCreated { entity, components };
        self.notify(&event)?;
        Ok(entity)
    }

    /// Attach `component` to `entity`.
    ///
    /// The `ComponentAdded` event is fired first, so handlers see the store
    /// as it was before the write. The value is written even if the entity
    /// already held the kind.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownEntity`] for entities this world never
    /// created, or [`WorldError::Dispatch`] if a handler failed. The write is
    /// applied in the latter case.
    pub fn add_component<C: Component>(
        &mut self,
        entity: Entity,
        component: C,
    ) -> Result<(), WorldError> {
        self.add_component_ref(entity, Arc::new(component))
    }

    /// Type-erased form of [`World::add_component`].
    ///
    /// # Errors
    ///
    /// See [`World::add_component`].
    pub fn add_component_ref(
        &mut self,
        entity: Entity,
        component: ComponentRef,
    ) -> Result<(), WorldError> {
        if !self.contains(entity) {
            return Err(WorldError::UnknownEntity(entity));
        }

        let event = Event::ComponentAdded {
            entity,
            component: Arc::clone(&component),
        };
        let report = self.bus.dispatch(&self.store, &event);
        self.store.insert(entity, component);
        Self::check(entity, report)
    }

    /// Write `component`, firing `ComponentAdded` only if `entity` did not
    /// hold the kind yet. Existing values are overwritten silently.
    ///
    /// Returns `true` if the component was newly added.
    ///
    /// # Errors
    ///
    /// See [`World::add_component`].
    pub fn update_component<C: Component>(
        &mut self,
        entity: Entity,
        component: C,
    ) -> Result<bool, WorldError> {
        self.update_component_ref(entity, Arc::new(component))
    }

    /// Type-erased form of [`World::update_component`].
    ///
    /// # Errors
    ///
    /// See [`World::add_component`].
    pub fn update_component_ref(
        &mut self,
        entity: Entity,
        component: ComponentRef,
    ) -> Result<bool, WorldError> {
        let name: ComponentName = component.name();
        if !self.store.has_component(entity, name.as_str()) {
            self.add_component_ref(entity, component)?;
            return Ok(true);
        }
        self.store.insert(entity, component);
        Ok(false)
    }

    /// Fire `event` on the bus against the current store.
    ///
    /// Used by the world itself and by extensions that implement removal on
    /// top of it.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Dispatch`] if any handler failed.
    pub fn notify(&self, event: &Event) -> Result<(), WorldError> {
        let report = self.bus.dispatch(&self.store, event);
        Self::check(event.entity(), report)
    }

    fn check(entity: Entity, report: DispatchReport) -> Result<(), WorldError> {
        report
            .into_result()
            .map(|_| ())
            .map_err(|source| WorldError::Dispatch { entity, source })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ecs_component::StoreError;

    use super::*;
    use crate::error::SystemError;
    use crate::event::{EventHandler, EventKind};
    use crate::system::SystemId;

    #[derive(Debug, Clone, PartialEq)]
    struct Name(String);

    impl Component for Name {
        fn type_name() -> &'static str {
            "Name"
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Age(u32);

    impl Component for Age {
        fn type_name() -> &'static str {
            "Age"
        }
    }

    fn person(name: &str, age: Option<u32>) -> Vec<ComponentRef> {
        let mut components: Vec<ComponentRef> = vec![Arc::new(Name(name.to_string()))];
        if let Some(age) = age {
            components.push(Arc::new(Age(age)));
        }
        components
    }

    /// Records what the store looked like from inside each handler call.
    #[derive(Default)]
    struct Probe {
        created: Mutex<Vec<(Entity, usize)>>,
        saw_age_before_write: Mutex<Vec<bool>>,
        added: AtomicUsize,
    }

    impl EventHandler for Probe {
        fn on_entity_created(
            &self,
            store: &ComponentStore,
            entity: Entity,
            components: &[ComponentRef],
        ) -> Result<(), SystemError> {
            assert!(store.has_component(entity, "Name"));
            self.created.lock().unwrap().push((entity, components.len()));
            Ok(())
        }

        fn on_component_added(
            &self,
            store: &ComponentStore,
            entity: Entity,
            component: &dyn AnyComponent,
        ) -> Result<(), SystemError> {
            self.added.fetch_add(1, Ordering::SeqCst);
            self.saw_age_before_write
                .lock()
                .unwrap()
                .push(store.has_component(entity, component.name().as_str()));
            Ok(())
        }
    }

    fn probed_world() -> (World, Arc<Probe>) {
        let mut world = World::new();
        let probe = Arc::new(Probe::default());
        world.bus_mut().subscribe_all(SystemId::new(0), probe.clone());
        (world, probe)
    }

    #[test]
    fn test_new_entity_fires_one_created_event() {
        let (mut world, probe) = probed_world();
        let e = world.new_entity(person("John", Some(32))).unwrap();

        assert_eq!(*probe.created.lock().unwrap(), vec![(e, 2)]);
        assert_eq!(probe.added.load(Ordering::SeqCst), 0);
        assert_eq!(world.store().get::<Age>(e).unwrap(), &Age(32));
    }

    #[test]
    fn test_entity_ids_strictly_increase() {
        let mut world = World::new();
        let ids: Vec<Entity> = (0..10)
            .map(|i| world.new_entity(person(&format!("p{i}"), None)).unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(ids[0].id() > 0);
        assert_eq!(world.entity_count(), 10);
    }

    #[test]
    fn test_add_component_notifies_before_write() {
        let (mut world, probe) = probed_world();
        let e = world.new_entity(person("Roxxie", None)).unwrap();

        world.add_component(e, Age(45)).unwrap();

        assert_eq!(probe.added.load(Ordering::SeqCst), 1);
        assert_eq!(*probe.saw_age_before_write.lock().unwrap(), vec![false]);
        assert_eq!(world.store().get::<Age>(e).unwrap(), &Age(45));
    }

    #[test]
    fn test_add_component_on_held_kind_still_fires() {
        let (mut world, probe) = probed_world();
        let e = world.new_entity(person("Diane", Some(39))).unwrap();

        world.add_component(e, Age(40)).unwrap();

        assert_eq!(*probe.saw_age_before_write.lock().unwrap(), vec![true]);
        assert_eq!(world.store().get::<Age>(e).unwrap(), &Age(40));
    }

    #[test]
    fn test_update_component_adds_when_missing() {
        let (mut world, probe) = probed_world();
        let e = world.new_entity(person("Michael", None)).unwrap();

        assert!(world.update_component(e, Age(47)).unwrap());
        assert_eq!(probe.added.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_update_component_overwrites_silently() {
        let (mut world, probe) = probed_world();
        let e = world.new_entity(person("Michael", Some(47))).unwrap();

        assert!(!world.update_component(e, Age(48)).unwrap());
        assert_eq!(probe.added.load(Ordering::SeqCst), 0);
        assert_eq!(world.store().get::<Age>(e).unwrap(), &Age(48));
    }

    #[test]
    fn test_add_component_to_unknown_entity() {
        let mut world = World::new();
        let ghost = Entity::from_raw(99).unwrap();
        assert!(matches!(
            world.add_component(ghost, Age(1)),
            Err(WorldError::UnknownEntity(e)) if e == ghost
        ));
        assert!(!world.store().has_component(ghost, "Age"));
    }

    #[test]
    fn test_handler_failure_surfaces_after_write() {
        struct Reject;

        impl EventHandler for Reject {
            fn on_component_added(
                &self,
                _store: &ComponentStore,
                _entity: Entity,
                _component: &dyn AnyComponent,
            ) -> Result<(), SystemError> {
                Err(SystemError::Handler("no".into()))
            }
        }

        let mut world = World::new();
        world
            .bus_mut()
            .subscribe(EventKind::ComponentAdded, SystemId::new(0), Arc::new(Reject));
        let e = world.new_entity(person("John", None)).unwrap();

        let err = world.add_component(e, Age(1)).unwrap_err();
        match err {
            WorldError::Dispatch { entity, source } => {
                assert_eq!(entity, e);
                assert_eq!(source.failures.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(world.store().get::<Age>(e).unwrap(), &Age(1));
    }

    #[test]
    fn test_register_component_is_idempotent() {
        let mut world = World::new();
        assert!(world.register_component(&Age(1)));
        assert!(!world.register_component(&Age(2)));
        assert_eq!(world.store().kind_count(), 1);
    }

    #[test]
    fn test_lookup_miss() {
        let mut world = World::new();
        let e = world.new_entity(person("Guy without age", None)).unwrap();
        assert!(world.store().get_component(e, "Age").is_none());
        assert!(matches!(
            world.store().get::<Age>(e),
            Err(StoreError::ComponentNotFound { .. })
        ));
    }
}
