//! Store-level error types.

use crate::component::ComponentName;
use crate::entity::Entity;

/// Errors raised by the component store and entity allocator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The entity does not hold a component of this kind.
    #[error("component '{name}' not found on {entity}")]
    ComponentNotFound {
        /// The requested kind.
        name: ComponentName,
        /// The entity that was looked up.
        entity: Entity,
    },

    /// A component of this kind exists but is not the requested Rust type.
    #[error("component '{name}' on {entity} is not a {expected}")]
    TypeMismatch {
        /// The requested kind.
        name: ComponentName,
        /// The entity that was looked up.
        entity: Entity,
        /// The Rust type the caller asked for.
        expected: &'static str,
    },

    /// Every entity identifier has been handed out.
    #[error("entity identifiers exhausted")]
    EntitiesExhausted,
}
