//! System registry: the append-only, phase-partitioned list of systems.
//!
//! Each registered system gets the next [`SystemId`], which is both its
//! index in the list and its key in every event subscriber map. Systems are
//! never removed, so ids stay valid for the registry's lifetime.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info, warn};

use ecs_system::{InitContext, Phase, ShutdownSignal, System, SystemError, SystemId, World};

/// Errors raised while registering a system.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The system's `init` failed; it was not registered.
    #[error("system `{name}` failed to initialise: {source}")]
    Init {
        /// The system's diagnostic name.
        name: String,
        /// What `init` reported.
        #[source]
        source: SystemError,
    },

    /// No phase was given for the system.
    #[error("system `{0}` was registered without a phase")]
    NoPhase(String),
}

/// A system together with its registration metadata.
struct RegisteredSystem<A> {
    /// The system's diagnostic name, captured at registration.
    name: String,
    /// Every phase the system runs in.
    phases: Vec<Phase>,
    /// The system itself.
    system: Box<dyn System<A>>,
}

/// Registry of all systems, bucketed by phase.
pub struct SystemRegistry<A> {
    /// Systems indexed by [`SystemId`].
    systems: Vec<RegisteredSystem<A>>,
    /// Ids per phase, in registration order.
    phases: HashMap<Phase, Vec<SystemId>>,
}

impl<A> fmt::Debug for SystemRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemRegistry")
            .field(
                "systems",
                &self.systems.iter().map(|s| &s.name).collect::<Vec<_>>(),
            )
            .field("phases", &self.phases)
            .finish()
    }
}

impl<A> Default for SystemRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> SystemRegistry<A> {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            phases: HashMap::new(),
        }
    }

    /// Register `system` under `phase` and initialise it.
    ///
    /// # Errors
    ///
    /// See [`SystemRegistry::register_in`].
    pub fn register(
        &mut self,
        world: &mut World,
        shutdown: &ShutdownSignal,
        phase: Phase,
        system: Box<dyn System<A>>,
    ) -> Result<SystemId, RegistryError> {
        self.register_in(world, shutdown, &[phase], system)
    }

    /// Register `system` once under every phase in `phases` and initialise
    /// it.
    ///
    /// `init` runs synchronously with the id the system will receive. If it
    /// fails, every subscription made under that id is dropped, the system
    /// is discarded and the id is not consumed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoPhase`] for an empty `phases` list, or
    /// [`RegistryError::Init`] if the system's `init` failed.
    pub fn register_in(
        &mut self,
        world: &mut World,
        shutdown: &ShutdownSignal,
        phases: &[Phase],
        mut system: Box<dyn System<A>>,
    ) -> Result<SystemId, RegistryError> {
        let name = system.name().to_string();
        if phases.is_empty() {
            return Err(RegistryError::NoPhase(name));
        }

        let id = SystemId::new(self.systems.len());
        let mut ctx = InitContext::new(id, world, shutdown);
        if let Err(source) = system.init(&mut ctx) {
            let dropped = world.bus_mut().unsubscribe_all(id);
            warn!(system = %id, name = %name, dropped, error = %source, "system init failed");
            return Err(RegistryError::Init { name, source });
        }

        let mut unique = Vec::with_capacity(phases.len());
        for &phase in phases {
            if !unique.contains(&phase) {
                unique.push(phase);
                self.phases.entry(phase).or_default().push(id);
            }
        }

        info!(system = %id, name = %name, phases = ?unique, "registered system");
        self.systems.push(RegisteredSystem {
            name,
            phases: unique,
            system,
        });
        Ok(id)
    }

    /// Run every system of `phase` once, in registration order.
    ///
    /// Returns the logical AND of all results. Every system runs even after
    /// an earlier one failed. A phase with no systems logs a warning and
    /// returns `false`.
    pub fn run_phase(&mut self, world: &mut World, phase: Phase, args: &A) -> bool {
        let Some(ids) = self.phases.get(&phase).filter(|ids| !ids.is_empty()) else {
            warn!(%phase, "no systems registered for phase");
            return false;
        };

        let mut passed = true;
        for id in ids {
            let Some(entry) = self.systems.get_mut(id.index()) else {
                warn!(%phase, system = %id, "phase lists an unregistered system");
                passed = false;
                continue;
            };
            if !entry.system.run(world, args) {
                debug!(%phase, system = %id, name = %entry.name, "system reported failure");
                passed = false;
            }
        }
        passed
    }

    /// Returns the number of registered systems.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Returns the ids registered under `phase`, in run order.
    #[must_use]
    pub fn phase_systems(&self, phase: Phase) -> &[SystemId] {
        self.phases.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the diagnostic name of a system.
    #[must_use]
    pub fn name(&self, id: SystemId) -> Option<&str> {
        self.systems.get(id.index()).map(|s| s.name.as_str())
    }

    /// Returns the phases a system runs in.
    #[must_use]
    pub fn phases_of(&self, id: SystemId) -> Option<&[Phase]> {
        self.systems.get(id.index()).map(|s| s.phases.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ecs_system::{EventKind, FnSystem, Membership};

    use super::*;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn logging(name: &'static str, log: &Log, result: bool) -> Box<dyn System<()>> {
        let log = log.clone();
        Box::new(FnSystem::new(name, move |_: &mut World, _: &()| {
            log.borrow_mut().push(name);
            result
        }))
    }

    /// Subscribes, then fails.
    struct BrokenInit;

    impl System<()> for BrokenInit {
        fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), SystemError> {
            let membership = Membership::new(ecs_component::Query::new());
            membership.subscribe(ctx);
            Err(SystemError::Init("missing resource".into()))
        }

        fn run(&mut self, _world: &mut World, _args: &()) -> bool {
            true
        }
    }

    #[test]
    fn test_ids_follow_registration_order() {
        let mut world = World::new();
        let shutdown = ShutdownSignal::new();
        let log = Log::default();
        let mut registry = SystemRegistry::new();

        let a = registry
            .register(&mut world, &shutdown, Phase::OnStart, logging("a", &log, true))
            .unwrap();
        let b = registry
            .register(&mut world, &shutdown, Phase::OnUpdate, logging("b", &log, true))
            .unwrap();

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(registry.system_count(), 2);
        assert_eq!(registry.name(b), Some("b"));
    }

    #[test]
    fn test_run_phase_in_registration_order() {
        let mut world = World::new();
        let shutdown = ShutdownSignal::new();
        let log = Log::default();
        let mut registry = SystemRegistry::new();
        for name in ["first", "second", "third"] {
            registry
                .register(&mut world, &shutdown, Phase::OnUpdate, logging(name, &log, true))
                .unwrap();
        }

        assert!(registry.run_phase(&mut world, Phase::OnUpdate, &()));
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_run_phase_does_not_short_circuit() {
        let mut world = World::new();
        let shutdown = ShutdownSignal::new();
        let log = Log::default();
        let mut registry = SystemRegistry::new();
        registry
            .register(&mut world, &shutdown, Phase::OnUpdate, logging("p1", &log, true))
            .unwrap();
        registry
            .register(&mut world, &shutdown, Phase::OnUpdate, logging("p2", &log, false))
            .unwrap();
        registry
            .register(&mut world, &shutdown, Phase::OnUpdate, logging("p3", &log, true))
            .unwrap();

        assert!(!registry.run_phase(&mut world, Phase::OnUpdate, &()));
        assert_eq!(*log.borrow(), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_empty_phase_returns_false() {
        let mut world = World::new();
        let mut registry: SystemRegistry<()> = SystemRegistry::new();
        assert!(!registry.run_phase(&mut world, Phase::OnExit, &()));
    }

    #[test]
    fn test_dangling_phase_entry_fails_phase() {
        let mut world = World::new();
        let shutdown = ShutdownSignal::new();
        let log = Log::default();
        let mut registry = SystemRegistry::new();
        registry
            .register(&mut world, &shutdown, Phase::OnUpdate, logging("real", &log, true))
            .unwrap();
        registry
            .phases
            .entry(Phase::OnUpdate)
            .or_default()
            .push(SystemId::new(9));

        assert!(!registry.run_phase(&mut world, Phase::OnUpdate, &()));
        assert_eq!(*log.borrow(), vec!["real"]);
    }

    #[test]
    fn test_register_in_several_phases() {
        let mut world = World::new();
        let shutdown = ShutdownSignal::new();
        let log = Log::default();
        let mut registry = SystemRegistry::new();

        let id = registry
            .register_in(
                &mut world,
                &shutdown,
                &[Phase::OnStart, Phase::OnExit, Phase::OnStart],
                logging("bookend", &log, true),
            )
            .unwrap();

        assert_eq!(registry.phases_of(id), Some(&[Phase::OnStart, Phase::OnExit][..]));
        assert_eq!(registry.phase_systems(Phase::OnStart), &[id]);
        assert_eq!(registry.phase_systems(Phase::OnExit), &[id]);
        assert!(registry.phase_systems(Phase::OnUpdate).is_empty());

        assert!(registry.run_phase(&mut world, Phase::OnStart, &()));
        assert!(registry.run_phase(&mut world, Phase::OnExit, &()));
        assert_eq!(*log.borrow(), vec!["bookend", "bookend"]);
    }

    #[test]
    fn test_no_phase_is_rejected() {
        let mut world = World::new();
        let shutdown = ShutdownSignal::new();
        let log = Log::default();
        let mut registry = SystemRegistry::new();
        let err = registry
            .register_in(&mut world, &shutdown, &[], logging("lost", &log, true))
            .unwrap_err();
        assert!(matches!(err, RegistryError::NoPhase(name) if name == "lost"));
        assert_eq!(registry.system_count(), 0);
    }

    #[test]
    fn test_init_failure_aborts_registration() {
        let mut world = World::new();
        let shutdown = ShutdownSignal::new();
        let log = Log::default();
        let mut registry = SystemRegistry::new();

        let err = registry
            .register(&mut world, &shutdown, Phase::OnUpdate, Box::new(BrokenInit))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Init { .. }));
        assert_eq!(registry.system_count(), 0);
        assert!(registry.phase_systems(Phase::OnUpdate).is_empty());
        for kind in EventKind::ALL {
            assert_eq!(world.bus().subscriber_count(kind), 0);
        }

        // The failed registration did not consume an id.
        let id = registry
            .register(&mut world, &shutdown, Phase::OnUpdate, logging("ok", &log, true))
            .unwrap();
        assert_eq!(id.index(), 0);
    }
}
