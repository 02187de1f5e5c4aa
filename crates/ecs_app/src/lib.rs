//! # ecs_app
//!
//! Runs systems: the phase registry, the Start/Update/Exit scheduler, tick
//! configuration, and the [`Ecs`] facade tying them to a
//! [`World`](ecs_system::World).

pub mod app;
pub mod registry;
pub mod scheduler;
pub mod tick;

pub use app::Ecs;
pub use registry::{RegistryError, SystemRegistry};
pub use scheduler::{RunError, RunSummary, Scheduler, StopReason};
pub use tick::{MAX_TICKS_ENV, TICK_RATE_ENV, TickConfig, TickPacer};
