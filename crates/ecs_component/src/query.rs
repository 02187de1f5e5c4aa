//! Multi-component queries over the [`ComponentStore`].
//!
//! Queries are computed fresh on every call. For several requested kinds the
//! engine picks the kind with the fewest entities as the driver set and only
//! scans that set, testing membership in every other requested submap. This
//! bounds a query to `O(min-cardinality × k)` instead of the sum of all
//! submap sizes.

use std::collections::HashSet;

use crate::component::{Component, ComponentName};
use crate::entity::Entity;
use crate::store::ComponentStore;

/// Declares the component kinds an entity must hold to match.
///
/// Systems build a `Query` once and hand it to their membership set; the
/// same value can be run ad hoc against a store with [`Query::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Required kinds, deduplicated, in declaration order.
    required: Vec<ComponentName>,
}

impl Query {
    /// Create an empty query. An empty query matches no entity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            required: Vec::new(),
        }
    }

    /// Require the component type `T`.
    #[must_use]
    pub fn with<T: Component>(self) -> Self {
        self.with_name(ComponentName::of::<T>())
    }

    /// Require the component kind `name`.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<ComponentName>) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    /// Returns the required component kinds.
    #[must_use]
    pub fn required(&self) -> &[ComponentName] {
        &self.required
    }

    /// Returns `true` if `name` is one of the required kinds.
    #[must_use]
    pub fn requires(&self, name: &str) -> bool {
        self.required.iter().any(|r| r.as_str() == name)
    }

    /// Returns `true` if the query requires nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    /// Returns `true` if `entity` currently matches this query in `store`.
    #[must_use]
    pub fn matches(&self, store: &ComponentStore, entity: Entity) -> bool {
        !self.is_empty() && store.has_components(entity, &self.required)
    }

    /// Compute the set of matching entities.
    #[must_use]
    pub fn run(&self, store: &ComponentStore) -> HashSet<Entity> {
        store.entities_with_components(&self.required)
    }
}

impl ComponentStore {
    /// Returns every entity holding kind `name`, in no particular order.
    #[must_use]
    pub fn entities_with_component(&self, name: &str) -> HashSet<Entity> {
        self.submap(name)
            .map(|entities| entities.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Returns every entity holding all of `names`.
    ///
    /// An empty `names` list yields the empty set.
    #[must_use]
    pub fn entities_with_components(&self, names: &[ComponentName]) -> HashSet<Entity> {
        match names {
            [] => HashSet::new(),
            [name] => self.entities_with_component(name.as_str()),
            _ => self.intersect(names),
        }
    }

    /// Least-cardinality-first intersection of several kinds.
    fn intersect(&self, names: &[ComponentName]) -> HashSet<Entity> {
        let mut submaps = Vec::with_capacity(names.len());
        for name in names {
            match self.submap(name.as_str()) {
                Some(entities) if !entities.is_empty() => submaps.push(entities),
                // A missing or empty kind empties the whole intersection.
                _ => return HashSet::new(),
            }
        }

        let Some((driver_idx, driver)) = submaps
            .iter()
            .enumerate()
            .min_by_key(|(_, entities)| entities.len())
        else {
            return HashSet::new();
        };

        driver
            .keys()
            .copied()
            .filter(|entity| {
                submaps
                    .iter()
                    .enumerate()
                    .all(|(idx, entities)| idx == driver_idx || entities.contains_key(entity))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::component::AnyComponent;

    #[derive(Debug)]
    struct Name(&'static str);

    impl Component for Name {
        fn type_name() -> &'static str {
            "Name"
        }
    }

    #[derive(Debug)]
    struct Age(u32);

    impl Component for Age {
        fn type_name() -> &'static str {
            "Age"
        }
    }

    fn entity(id: u64) -> Entity {
        Entity::from_raw(id).unwrap()
    }

    fn name_age() -> Vec<ComponentName> {
        vec![ComponentName::of::<Name>(), ComponentName::of::<Age>()]
    }

    #[test]
    fn test_empty_input_is_empty_set() {
        let mut store = ComponentStore::new();
        store.insert(entity(1), Arc::new(Name("X")));
        assert!(store.entities_with_components(&[]).is_empty());
        assert!(Query::new().run(&store).is_empty());
    }

    #[test]
    fn test_single_name_delegates() {
        let mut store = ComponentStore::new();
        store.insert(entity(1), Arc::new(Name("X")));
        store.insert(entity(2), Arc::new(Name("Y")));
        let expected: HashSet<Entity> = [entity(1), entity(2)].into();
        assert_eq!(
            store.entities_with_components(&[ComponentName::of::<Name>()]),
            expected
        );
        assert_eq!(store.entities_with_component("Name"), expected);
    }

    #[test]
    fn test_unknown_kind_is_empty() {
        let mut store = ComponentStore::new();
        store.insert(entity(1), Arc::new(Name("X")));
        assert!(store.entities_with_component("Missing").is_empty());
        let names = [ComponentName::of::<Name>(), ComponentName::from_static("Missing")];
        assert!(store.entities_with_components(&names).is_empty());
    }

    #[test]
    fn test_name_age_scenario() {
        let mut store = ComponentStore::new();
        let a = entity(1);
        let b = entity(2);
        store.insert(a, Arc::new(Name("X")));
        store.insert(b, Arc::new(Name("Y")));
        store.insert(b, Arc::new(Age(5)));

        let names = name_age();
        assert_eq!(store.entities_with_components(&names), HashSet::from([b]));

        store.insert(a, Arc::new(Age(10)));
        assert_eq!(store.entities_with_components(&names), HashSet::from([a, b]));
    }

    #[test]
    fn test_query_builder_dedups() {
        let query = Query::new().with::<Name>().with::<Age>().with::<Name>();
        assert_eq!(query.required(), name_age().as_slice());
        assert!(query.requires("Age"));
        assert!(!query.requires("Velocity"));
    }

    #[test]
    fn test_query_matches() {
        let mut store = ComponentStore::new();
        let e = entity(1);
        store.insert(e, Arc::new(Name("X")));
        let query = Query::new().with::<Name>().with::<Age>();
        assert!(!query.matches(&store, e));
        store.insert(e, Arc::new(Age(3)));
        assert!(query.matches(&store, e));
        assert!(!Query::new().matches(&store, e));
    }

    /// Inserts a value under an arbitrary kind name.
    fn insert_tag(store: &mut ComponentStore, entity: Entity, kind: &ComponentName) {
        #[derive(Debug)]
        struct Named(ComponentName);

        impl AnyComponent for Named {
            fn name(&self) -> ComponentName {
                self.0.clone()
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }

        store.insert(entity, Arc::new(Named(kind.clone())));
    }

    #[test]
    fn test_matches_brute_force_intersection() {
        let kinds: Vec<ComponentName> = (0..6)
            .map(|i| ComponentName::new(format!("Kind{i}")))
            .collect();
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..50 {
            let mut store = ComponentStore::new();
            let entity_count = rng.gen_range(0..60u64);
            for id in 1..=entity_count {
                for kind in &kinds {
                    if rng.gen_bool(0.45) {
                        insert_tag(&mut store, entity(id), kind);
                    }
                }
            }

            for _ in 0..20 {
                let requested: Vec<ComponentName> = kinds
                    .iter()
                    .filter(|_| rng.gen_bool(0.4))
                    .cloned()
                    .collect();

                let brute: HashSet<Entity> = if requested.is_empty() {
                    HashSet::new()
                } else {
                    (1..=entity_count)
                        .map(entity)
                        .filter(|e| store.has_components(*e, &requested))
                        .collect()
                };

                assert_eq!(
                    store.entities_with_components(&requested),
                    brute,
                    "query {requested:?} diverged from brute force"
                );
            }
        }
    }
}
