//! Cooperative shutdown.
//!
//! A [`ShutdownSignal`] is a shared flag raised by something outside the
//! tick loop (typically an interrupt listener). Nothing is interrupted when
//! it is raised: the [`ShutdownSystem`] polls it once per tick and fails the
//! update phase, which ends the loop after the current tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::context::InitContext;
use crate::error::SystemError;
use crate::system::System;
use crate::world::World;

/// A cloneable, thread-safe stop flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Create a signal that has not been raised.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Idempotent.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once the signal has been raised.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Fails the update phase once the world's shutdown signal is raised.
#[derive(Debug, Default)]
pub struct ShutdownSystem {
    signal: Option<ShutdownSignal>,
}

impl ShutdownSystem {
    /// Create the system. It picks up the signal during `init`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A> System<A> for ShutdownSystem {
    fn name(&self) -> &str {
        "shutdown"
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), SystemError> {
        self.signal = Some(ctx.shutdown().clone());
        Ok(())
    }

    fn run(&mut self, _world: &mut World, _args: &A) -> bool {
        match &self.signal {
            Some(signal) if signal.is_requested() => {
                info!("shutdown requested, stopping after this tick");
                false
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_shared_between_clones() {
        let signal = ShutdownSignal::new();
        let listener = signal.clone();
        assert!(!signal.is_requested());
        listener.request();
        assert!(signal.is_requested());
    }

    #[test]
    fn test_signal_from_another_thread() {
        let signal = ShutdownSignal::new();
        let remote = signal.clone();
        std::thread::spawn(move || remote.request()).join().unwrap();
        assert!(signal.is_requested());
    }
}
