//! # ecs_component
//!
//! The "E" and "C" in ECS: what a component is, how entities are issued, and
//! how components are stored and queried.
//!
//! This crate provides:
//!
//! - [`Component`] / [`AnyComponent`] — the contract all ECS data must satisfy.
//! - [`Entity`] — lightweight non-zero `u64` entity identifiers.
//! - [`EntityAllocator`] — monotonically increasing ID allocator.
//! - [`ComponentStore`] — per-kind entity → value storage.
//! - [`Query`] — declarative component requirements and the
//!   least-cardinality-first intersection engine.

pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod store;

pub use component::{AnyComponent, Component, ComponentName};
pub use entity::{Entity, EntityAllocator};
pub use error::StoreError;
pub use query::Query;
pub use store::{ComponentRef, ComponentStore};
