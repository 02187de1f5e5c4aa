//! The [`Ecs`] facade: one world, one registry, one scheduler.

use tracing::info;

use ecs_component::{ComponentRef, Entity};
use ecs_system::{Phase, ShutdownSignal, System, SystemId, World, WorldError};

use crate::registry::{RegistryError, SystemRegistry};
use crate::scheduler::{RunError, RunSummary, Scheduler};
use crate::tick::TickConfig;

/// An entity-component-system runtime whose systems receive `&A` each run.
///
/// ```rust
/// use ecs_app::Ecs;
/// use ecs_system::{FnSystem, World};
///
/// let mut ecs: Ecs<()> = Ecs::new();
/// ecs.on_start(FnSystem::new("hello", |_: &mut World, _: &()| true))
///     .unwrap()
///     .on_update(FnSystem::new("once", |_: &mut World, _: &()| false))
///     .unwrap()
///     .on_exit(FnSystem::new("bye", |_: &mut World, _: &()| true))
///     .unwrap();
///
/// let summary = ecs.run(&()).unwrap();
/// assert_eq!(summary.ticks, 1);
/// ```
pub struct Ecs<A> {
    world: World,
    registry: SystemRegistry<A>,
    scheduler: Scheduler,
    shutdown: ShutdownSignal,
}

impl<A> std::fmt::Debug for Ecs<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ecs")
            .field("world", &self.world)
            .field("registry", &self.registry)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<A> Default for Ecs<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Ecs<A> {
    /// Create an empty runtime with an unpaced, unbounded update loop.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TickConfig::default())
    }

    /// Create an empty runtime with the given tick configuration.
    #[must_use]
    pub fn with_config(config: TickConfig) -> Self {
        Self {
            world: World::new(),
            registry: SystemRegistry::new(),
            scheduler: Scheduler::new(config),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Use `signal` as the run's shutdown signal.
    ///
    /// Systems pick the signal up during `init`, so this must be called
    /// before any system is registered.
    #[must_use]
    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = signal;
        self
    }

    /// Read access to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Read access to the system registry.
    #[must_use]
    pub fn registry(&self) -> &SystemRegistry<A> {
        &self.registry
    }

    /// The shutdown signal handed to every system.
    #[must_use]
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Returns the number of update ticks executed so far.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.scheduler.tick_id()
    }

    /// Register and initialise `system` under `phase`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Init`] if the system's `init` failed.
    pub fn register_system(
        &mut self,
        phase: Phase,
        system: impl System<A> + 'static,
    ) -> Result<SystemId, RegistryError> {
        self.register_system_in(&[phase], system)
    }

    /// Register and initialise `system` once under every phase in `phases`.
    ///
    /// # Errors
    ///
    /// See [`SystemRegistry::register_in`].
    pub fn register_system_in(
        &mut self,
        phases: &[Phase],
        system: impl System<A> + 'static,
    ) -> Result<SystemId, RegistryError> {
        self.registry
            .register_in(&mut self.world, &self.shutdown, phases, Box::new(system))
    }

    /// Register several boxed systems under `phase`, in order.
    ///
    /// Stops at the first system whose `init` fails; systems before it stay
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Init`] for the first failing system.
    pub fn register_systems(
        &mut self,
        phase: Phase,
        systems: impl IntoIterator<Item = Box<dyn System<A>>>,
    ) -> Result<Vec<SystemId>, RegistryError> {
        systems
            .into_iter()
            .map(|system| {
                self.registry
                    .register(&mut self.world, &self.shutdown, phase, system)
            })
            .collect()
    }

    /// Register `system` under [`Phase::OnStart`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Init`] if the system's `init` failed.
    pub fn on_start(&mut self, system: impl System<A> + 'static) -> Result<&mut Self, RegistryError> {
        self.register_system(Phase::OnStart, system)?;
        Ok(self)
    }

    /// Register `system` under [`Phase::OnUpdate`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Init`] if the system's `init` failed.
    pub fn on_update(&mut self, system: impl System<A> + 'static) -> Result<&mut Self, RegistryError> {
        self.register_system(Phase::OnUpdate, system)?;
        Ok(self)
    }

    /// Register `system` under [`Phase::OnExit`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Init`] if the system's `init` failed.
    pub fn on_exit(&mut self, system: impl System<A> + 'static) -> Result<&mut Self, RegistryError> {
        self.register_system(Phase::OnExit, system)?;
        Ok(self)
    }

    /// Create an entity holding `components`.
    ///
    /// # Errors
    ///
    /// See [`World::new_entity`].
    pub fn new_entity(&mut self, components: Vec<ComponentRef>) -> Result<Entity, WorldError> {
        self.world.new_entity(components)
    }

    /// Run every system of `phase` once. See [`SystemRegistry::run_phase`].
    pub fn run_phase(&mut self, phase: Phase, args: &A) -> bool {
        self.registry.run_phase(&mut self.world, phase, args)
    }

    /// Run the start phase once.
    pub fn start(&mut self, args: &A) -> bool {
        self.scheduler.start(&mut self.registry, &mut self.world, args)
    }

    /// Run a single update tick.
    pub fn update(&mut self, args: &A) -> bool {
        self.scheduler.update(&mut self.registry, &mut self.world, args)
    }

    /// Run the exit phase once.
    pub fn exit(&mut self, args: &A) -> bool {
        self.scheduler.exit(&mut self.registry, &mut self.world, args)
    }

    /// Run the full Start, Update, Exit lifecycle.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::run`].
    pub fn run(&mut self, args: &A) -> Result<RunSummary, RunError> {
        info!(
            systems = self.registry.system_count(),
            entities = self.world.entity_count(),
            "running"
        );
        self.scheduler
            .run(&mut self.registry, &mut self.world, args)
    }
}
