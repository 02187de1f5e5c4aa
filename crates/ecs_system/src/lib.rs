//! # ecs_system
//!
//! Systems and the reactive machinery that keeps them informed.
//!
//! This crate provides:
//!
//! - [`System`] — the `init` / `run` contract, with [`SystemId`] and [`Phase`].
//! - [`World`] — entity allocation, component storage and event firing.
//! - [`EventBus`] — four event channels with blocking, parallel fan-out.
//! - [`Membership`] — a query result kept current by events instead of
//!   recomputation.
//! - [`ShutdownSignal`] / [`ShutdownSystem`] — cooperative stop.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ecs_component::{Component, Query};
//! use ecs_system::{InitContext, Membership, ShutdownSignal, SystemId, World};
//!
//! #[derive(Debug)]
//! struct Name(&'static str);
//!
//! impl Component for Name {
//!     fn type_name() -> &'static str { "Name" }
//! }
//!
//! let mut world = World::new();
//! let shutdown = ShutdownSignal::new();
//! let mut ctx = InitContext::new(SystemId::new(0), &mut world, &shutdown);
//! let named = Membership::attach(Query::new().with::<Name>(), &mut ctx);
//!
//! let entity = world.new_entity(vec![Arc::new(Name("John"))]).unwrap();
//! assert!(named.contains(entity));
//! ```

pub mod context;
pub mod error;
pub mod event;
pub mod membership;
pub mod shutdown;
pub mod system;
pub mod world;

pub use context::InitContext;
pub use error::{DispatchError, HandlerFailure, HandlerFault, SystemError, WorldError};
pub use event::{DispatchReport, Event, EventBus, EventHandler, EventKind};
pub use membership::{Membership, MembershipChange};
pub use shutdown::{ShutdownSignal, ShutdownSystem};
pub use system::{FnSystem, Phase, System, SystemId};
pub use world::World;
