//! The [`System`] trait, system identity and scheduling phases.
//!
//! A system is initialised exactly once, synchronously, when it is
//! registered, and is then run once per tick of every phase it was
//! registered under.

use std::fmt;

use crate::context::InitContext;
use crate::error::SystemError;
use crate::world::World;

/// Stable identifier of a registered system.
///
/// The id is the system's index in the registry's list and its key in every
/// event subscriber map. Systems are never deregistered, so an id stays
/// valid for the lifetime of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(usize);

impl SystemId {
    /// Create an id from a registry index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the registry index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "System({})", self.0)
    }
}

/// Lifecycle bucket a system runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Runs once before the update loop.
    OnStart,
    /// Runs once per tick until a tick fails.
    OnUpdate,
    /// Runs once after the update loop.
    OnExit,
}

impl Phase {
    /// Every phase, in lifecycle order.
    pub const ALL: [Phase; 3] = [Phase::OnStart, Phase::OnUpdate, Phase::OnExit];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OnStart => "OnStart",
            Self::OnUpdate => "OnUpdate",
            Self::OnExit => "OnExit",
        };
        f.write_str(name)
    }
}

/// A unit of behaviour run by the scheduler.
///
/// `A` is the per-run argument type handed to every `run` call.
///
/// # Examples
///
/// ```rust
/// use ecs_component::Query;
/// use ecs_system::{InitContext, Membership, System, SystemError, World};
///
/// #[derive(Debug)]
/// struct Name(String);
///
/// impl ecs_component::Component for Name {
///     fn type_name() -> &'static str { "Name" }
/// }
///
/// #[derive(Default)]
/// struct Greeter {
///     named: Option<Membership>,
/// }
///
/// impl System<()> for Greeter {
///     fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), SystemError> {
///         self.named = Some(Membership::attach(Query::new().with::<Name>(), ctx));
///         Ok(())
///     }
///
///     fn run(&mut self, world: &mut World, _args: &()) -> bool {
///         if let Some(named) = &self.named {
///             for entity in named.entities() {
///                 if let Ok(name) = world.store().get::<Name>(entity) {
///                     println!("Hi {}", name.0);
///                 }
///             }
///         }
///         true
///     }
/// }
/// ```
pub trait System<A> {
    /// A human-readable name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Set the system up: create its membership set, subscribe to events,
    /// backfill from the current store.
    ///
    /// # Errors
    ///
    /// An error aborts the system's registration.
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), SystemError>;

    /// Run one tick. Returning `false` fails the phase for this tick.
    fn run(&mut self, world: &mut World, args: &A) -> bool;
}

/// A system built from a plain function with no `init` work.
pub struct FnSystem<F> {
    name: String,
    func: F,
}

impl<F> FnSystem<F> {
    /// Wrap `func` under a diagnostic name.
    #[must_use]
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> fmt::Debug for FnSystem<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSystem").field("name", &self.name).finish()
    }
}

impl<A, F> System<A> for FnSystem<F>
where
    F: FnMut(&mut World, &A) -> bool,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), SystemError> {
        Ok(())
    }

    fn run(&mut self, world: &mut World, args: &A) -> bool {
        (self.func)(world, args)
    }
}
