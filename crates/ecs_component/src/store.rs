//! Component storage keyed by component kind.
//!
//! The [`ComponentStore`] maps each [`ComponentName`] to a submap from
//! [`Entity`] to that entity's value of the kind. An entity appears under a
//! name iff it currently holds that kind.
//!
//! The store itself never notifies anyone. Writes that must be observed by
//! systems go through the world, which fires the matching event before or
//! after calling into the store.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::component::{AnyComponent, Component, ComponentName};
use crate::entity::Entity;
use crate::error::StoreError;

/// A shared handle to a stored component value.
pub type ComponentRef = Arc<dyn AnyComponent>;

/// Per-kind component storage.
#[derive(Debug, Default)]
pub struct ComponentStore {
    /// One submap per registered kind.
    kinds: HashMap<ComponentName, HashMap<Entity, ComponentRef>>,
}

impl ComponentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// Create the submap for a kind if it does not exist yet.
    ///
    /// Returns `true` if the submap was newly created.
    pub fn register_kind(&mut self, name: ComponentName) -> bool {
        if self.kinds.contains_key(&name) {
            return false;
        }
        debug!(component = %name, "registered component kind");
        self.kinds.insert(name, HashMap::new());
        true
    }

    /// Create the submap for `component`'s kind if it does not exist yet.
    ///
    /// Returns `true` if the submap was newly created.
    pub fn register_component(&mut self, component: &dyn AnyComponent) -> bool {
        self.register_kind(component.name())
    }

    /// Write a component value, registering its kind on first use.
    ///
    /// Returns the previous value of the same kind, if any. No event is
    /// fired.
    pub fn insert(&mut self, entity: Entity, component: ComponentRef) -> Option<ComponentRef> {
        self.kinds
            .entry(component.name())
            .or_default()
            .insert(entity, component)
    }

    /// Returns `true` if a submap exists for `name`.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// Returns `true` if `entity` holds a component of kind `name`.
    #[must_use]
    pub fn has_component(&self, entity: Entity, name: &str) -> bool {
        self.kinds
            .get(name)
            .is_some_and(|entities| entities.contains_key(&entity))
    }

    /// Returns `true` if `entity` holds every kind in `names`.
    ///
    /// An empty `names` list is trivially satisfied.
    #[must_use]
    pub fn has_components(&self, entity: Entity, names: &[ComponentName]) -> bool {
        names.iter().all(|name| self.has_component(entity, name.as_str()))
    }

    /// Returns the stored value of kind `name` for `entity`, or `None`.
    #[must_use]
    pub fn get_component(&self, entity: Entity, name: &str) -> Option<&ComponentRef> {
        self.kinds.get(name)?.get(&entity)
    }

    /// Returns the stored value of type `T` for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ComponentNotFound`] if the entity lacks the
    /// kind, or [`StoreError::TypeMismatch`] if another Rust type is stored
    /// under the same name.
    pub fn get<T: Component>(&self, entity: Entity) -> Result<&T, StoreError> {
        let name = ComponentName::of::<T>();
        let value = self
            .get_component(entity, name.as_str())
            .ok_or_else(|| StoreError::ComponentNotFound {
                name: name.clone(),
                entity,
            })?;
        value
            .downcast_ref::<T>()
            .ok_or(StoreError::TypeMismatch {
                name,
                entity,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Returns the number of entities holding kind `name`.
    #[must_use]
    pub fn kind_len(&self, name: &str) -> usize {
        self.kinds.get(name).map_or(0, HashMap::len)
    }

    /// Returns the number of registered kinds.
    #[must_use]
    pub fn kind_count(&self) -> usize {
        self.kinds.len()
    }

    /// Returns an iterator over all registered kind names.
    pub fn kinds(&self) -> impl Iterator<Item = &ComponentName> {
        self.kinds.keys()
    }

    /// Returns the submap for `name`, if registered.
    pub(crate) fn submap(&self, name: &str) -> Option<&HashMap<Entity, ComponentRef>> {
        self.kinds.get(name)
    }
}
