//! Core [`Component`] trait and its object-safe counterpart [`AnyComponent`].
//!
//! Every piece of data stored in the ECS must implement [`Component`]. The trait
//! requires `Send + Sync + 'static` so components can be read from the event
//! bus worker threads while a notification is in flight.
//!
//! ## Kind Identity
//!
//! A component kind is identified by its [`ComponentName`], the string
//! returned by [`Component::type_name`]. The name is the store's primary key
//! per kind, so two Rust types reporting the same name share one submap.

use std::any::Any;
use std::borrow::{Borrow, Cow};
use std::fmt;

/// The stable string key identifying a component kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentName(Cow<'static, str>);

impl ComponentName {
    /// Create a name from a static string without allocating.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create a name from any owned or borrowed string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Returns the [`ComponentName`] of a Rust component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_static(T::type_name())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ComponentName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ComponentName {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for ComponentName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// The core component trait.
///
/// All data stored in the ECS must implement this trait.
///
/// # Examples
///
/// ```rust
/// use ecs_component::Component;
///
/// #[derive(Debug, Clone)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
pub trait Component: fmt::Debug + Send + Sync + 'static {
    /// A human-readable name for this component kind.
    fn type_name() -> &'static str
    where
        Self: Sized;
}

/// Object-safe view of a stored component.
///
/// Implemented for every [`Component`]; the store and the event bus only
/// ever see components through this trait.
pub trait AnyComponent: fmt::Debug + Send + Sync + 'static {
    /// The [`ComponentName`] of this value's kind.
    fn name(&self) -> ComponentName;

    /// Upcast for downcasting back to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Component> AnyComponent for T {
    fn name(&self) -> ComponentName {
        ComponentName::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn AnyComponent {
    /// Returns `true` if the value is of concrete type `T`.
    #[must_use]
    pub fn is<T: Component>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Borrow the value as concrete type `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
