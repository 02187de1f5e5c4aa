//! Entity type and allocation utilities.
//!
//! An [`Entity`] is a lightweight non-zero `u64` identifier with no inherent
//! data. Identifiers are handed out by an [`EntityAllocator`] in strictly
//! increasing order and are never reused.

use std::fmt;
use std::num::NonZeroU64;

use crate::error::StoreError;

/// A unique entity identifier.
///
/// Entities are pure identifiers; components are attached to them to give
/// them meaning. Zero is never a valid identifier, which also gives
/// `Option<Entity>` the size of a bare `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(NonZeroU64);

impl Entity {
    /// Create an entity from a raw identifier, or `None` for zero.
    #[must_use]
    pub const fn from_raw(id: u64) -> Option<Self> {
        match NonZeroU64::new(id) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Allocates monotonically increasing entity IDs.
///
/// There is no free-list: a destroyed entity's ID is never handed out again.
#[derive(Debug)]
pub struct EntityAllocator {
    next_id: NonZeroU64,
    exhausted: bool,
}

impl EntityAllocator {
    /// Creates a new allocator. IDs start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: NonZeroU64::MIN,
            exhausted: false,
        }
    }

    /// Allocates a fresh entity ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EntitiesExhausted`] once `u64::MAX` has been
    /// handed out.
    pub fn allocate(&mut self) -> Result<Entity, StoreError> {
        if self.exhausted {
            return Err(StoreError::EntitiesExhausted);
        }
        let entity = Entity(self.next_id);
        match self.next_id.checked_add(1) {
            Some(next) => self.next_id = next,
            None => self.exhausted = true,
        }
        Ok(entity)
    }

    /// Returns `true` if `entity` has been handed out by this allocator.
    #[must_use]
    pub fn is_allocated(&self, entity: Entity) -> bool {
        self.exhausted || entity.0 < self.next_id
    }

    /// Returns the number of entities allocated so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        if self.exhausted {
            u64::MAX
        } else {
            self.next_id.get() - 1
        }
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
