//! Event-driven membership sets.
//!
//! A [`Membership`] tracks which entities currently hold every component
//! kind of a [`Query`]. It is built once during a system's `init`, backfilled
//! from the store, and from then on kept current by the event bus rather
//! than by re-running the query each tick. Its contents always equal
//! `query.run(store)`.
//!
//! Systems hold a `Membership` by value; the bus holds a clone of the same
//! handle. Only that system's handlers ever mutate the set.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use dashmap::DashSet;
use tracing::debug;

use ecs_component::{AnyComponent, ComponentRef, ComponentStore, Entity, Query};

use crate::context::InitContext;
use crate::error::SystemError;
use crate::event::EventHandler;

/// A transition observed by a membership set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    /// The entity started matching.
    Entered(Entity),
    /// The entity stopped matching.
    Left(Entity),
}

type Observer = Box<dyn Fn(MembershipChange) + Send + Sync>;

struct Inner {
    query: Query,
    members: DashSet<Entity>,
    observer: Option<Observer>,
}

/// A shared, always-current set of entities matching a query.
#[derive(Clone)]
pub struct Membership {
    inner: Arc<Inner>,
}

impl fmt::Debug for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Membership")
            .field("query", &self.inner.query)
            .field("len", &self.inner.members.len())
            .finish()
    }
}

impl Membership {
    /// Create an empty, unsubscribed set for `query`.
    #[must_use]
    pub fn new(query: Query) -> Self {
        Self::build(query, None)
    }

    /// Create an empty, unsubscribed set that reports every event-driven
    /// transition to `observer`. Backfilling is not reported.
    #[must_use]
    pub fn with_observer<F>(query: Query, observer: F) -> Self
    where
        F: Fn(MembershipChange) + Send + Sync + 'static,
    {
        Self::build(query, Some(Box::new(observer)))
    }

    fn build(query: Query, observer: Option<Observer>) -> Self {
        Self {
            inner: Arc::new(Inner {
                query,
                members: DashSet::new(),
                observer,
            }),
        }
    }

    /// Create a set for `query`, subscribe it to every event kind under the
    /// initialising system's id, and backfill it from the current store.
    #[must_use]
    pub fn attach(query: Query, ctx: &mut InitContext<'_>) -> Self {
        let membership = Self::new(query);
        membership.subscribe(ctx);
        membership
    }

    /// Subscribe this set to every event kind under the initialising
    /// system's id, then backfill it from the current store.
    pub fn subscribe(&self, ctx: &mut InitContext<'_>) {
        ctx.subscribe_all(Arc::new(self.clone()));
        let found = self.backfill(ctx.store());
        debug!(system = %ctx.id(), found, "membership attached");
    }

    /// Add every entity already matching the query. Returns how many
    /// entities were added.
    pub fn backfill(&self, store: &ComponentStore) -> usize {
        self.inner
            .query
            .run(store)
            .into_iter()
            .filter(|&entity| self.inner.members.insert(entity))
            .count()
    }

    /// The query this set tracks.
    #[must_use]
    pub fn query(&self) -> &Query {
        &self.inner.query
    }

    /// Returns `true` if `entity` currently matches.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.members.contains(&entity)
    }

    /// Returns the number of matching entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.members.len()
    }

    /// Returns `true` if nothing matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.members.is_empty()
    }

    /// Returns the matching entities in ascending id order.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.inner.members.iter().map(|e| *e).collect();
        entities.sort_unstable();
        entities
    }

    /// Returns the matching entities as a set.
    #[must_use]
    pub fn to_set(&self) -> HashSet<Entity> {
        self.inner.members.iter().map(|e| *e).collect()
    }

    fn enter(&self, entity: Entity) {
        if self.inner.members.insert(entity)
            && let Some(observer) = &self.inner.observer
        {
            observer(MembershipChange::Entered(entity));
        }
    }

    fn leave(&self, entity: Entity) {
        if self.inner.members.remove(&entity).is_some()
            && let Some(observer) = &self.inner.observer
        {
            observer(MembershipChange::Left(entity));
        }
    }
}

impl EventHandler for Membership {
    fn on_entity_created(
        &self,
        _store: &ComponentStore,
        entity: Entity,
        components: &[ComponentRef],
    ) -> Result<(), SystemError> {
        let query = &self.inner.query;
        if query.is_empty() {
            return Ok(());
        }
        let holds_all = query
            .required()
            .iter()
            .all(|name| components.iter().any(|c| c.name() == *name));
        if holds_all {
            self.enter(entity);
        }
        Ok(())
    }

    fn on_entity_removed(&self, _store: &ComponentStore, entity: Entity) -> Result<(), SystemError> {
        self.leave(entity);
        Ok(())
    }

    fn on_component_added(
        &self,
        store: &ComponentStore,
        entity: Entity,
        component: &dyn AnyComponent,
    ) -> Result<(), SystemError> {
        let added = component.name();
        let query = &self.inner.query;
        if !query.requires(added.as_str()) {
            return Ok(());
        }
        // The store does not hold `component` yet; every other required kind
        // must already be there.
        let others_present = query
            .required()
            .iter()
            .filter(|name| **name != added)
            .all(|name| store.has_component(entity, name.as_str()));
        if others_present {
            self.enter(entity);
        }
        Ok(())
    }

    fn on_component_removed(
        &self,
        _store: &ComponentStore,
        entity: Entity,
        component: &dyn AnyComponent,
    ) -> Result<(), SystemError> {
        if self.inner.query.requires(component.name().as_str()) {
            self.leave(entity);
        }
        Ok(())
    }
}
