//! System- and world-level error types.

use std::fmt;

use ecs_component::{Entity, StoreError};

use crate::event::EventKind;
use crate::system::SystemId;

/// Errors a system may report from `init` or from an event handler.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// The system could not set itself up.
    #[error("initialisation failed: {0}")]
    Init(String),

    /// An event handler rejected a notification.
    #[error("handler failed: {0}")]
    Handler(String),

    /// A store operation failed inside the system.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Any other failure, for systems written against `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// How a single handler invocation failed.
#[derive(Debug)]
pub enum HandlerFault {
    /// The handler returned an error.
    Error(SystemError),
    /// The handler panicked; the payload message is kept when it is a string.
    Panic(String),
}

impl fmt::Display for HandlerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(err) => write!(f, "{err}"),
            Self::Panic(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

/// A failed delivery of one event to one subscriber.
#[derive(Debug)]
pub struct HandlerFailure {
    /// The subscriber that failed.
    pub system: SystemId,
    /// What went wrong.
    pub fault: HandlerFault,
}

/// One or more handlers failed during a single dispatch.
#[derive(Debug, thiserror::Error)]
#[error("{} of {handlers} {kind} handler(s) failed", .failures.len())]
pub struct DispatchError {
    /// The kind of event that was dispatched.
    pub kind: EventKind,
    /// How many handlers the event was delivered to.
    pub handlers: usize,
    /// Every captured failure.
    pub failures: Vec<HandlerFailure>,
}

/// Errors raised by world mutations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The entity was never handed out by this world's allocator.
    #[error("{0} was never allocated")]
    UnknownEntity(Entity),

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The mutation was applied but some subscribers failed to observe it.
    #[error("notification for {entity} failed: {source}")]
    Dispatch {
        /// The entity the event was about.
        entity: Entity,
        /// The captured handler failures.
        #[source]
        source: DispatchError,
    },
}
