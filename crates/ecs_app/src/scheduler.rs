//! Lifecycle scheduler: Start once, Update until a tick fails, Exit once.
//!
//! The update loop stops after the first tick whose aggregate result is
//! `false`, or when the configured tick cap is reached. Exit always runs
//! exactly once, even if Start failed and Update was skipped.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, warn};

use ecs_system::{Phase, World};

use crate::registry::SystemRegistry;
use crate::tick::{TickConfig, TickPacer};

/// Why the update loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The start phase failed; no update tick ran.
    StartFailed,
    /// An update tick's aggregate result was `false`.
    UpdateFailed,
    /// The configured tick cap was reached.
    TickLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::StartFailed => "start failed",
            Self::UpdateFailed => "update failed",
            Self::TickLimit => "tick limit reached",
        };
        f.write_str(reason)
    }
}

/// Outcome of a complete run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Update ticks executed during the run.
    pub ticks: u64,
    /// Why the update loop ended.
    pub stop_reason: StopReason,
    /// Aggregate result of the start phase.
    pub start_ok: bool,
    /// Aggregate result of the exit phase.
    pub exit_ok: bool,
}

impl RunSummary {
    /// Returns `true` if both the start and exit phases passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.start_ok && self.exit_ok
    }
}

/// A run that failed overall.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The start phase failed. Exit still ran.
    #[error("start phase failed, update loop skipped")]
    StartFailed(RunSummary),

    /// The exit phase failed.
    #[error("exit phase failed after {} tick(s)", .0.ticks)]
    ExitFailed(RunSummary),
}

impl RunError {
    /// The summary of the failed run.
    #[must_use]
    pub fn summary(&self) -> &RunSummary {
        match self {
            Self::StartFailed(summary) | Self::ExitFailed(summary) => summary,
        }
    }
}

/// Drives the lifecycle phases of a [`SystemRegistry`].
#[derive(Debug)]
pub struct Scheduler {
    /// Update ticks executed so far.
    tick_id: u64,
    config: TickConfig,
    pacer: TickPacer,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(TickConfig::default())
    }
}

impl Scheduler {
    /// Create a scheduler with the given configuration.
    #[must_use]
    pub fn new(config: TickConfig) -> Self {
        Self {
            tick_id: 0,
            pacer: TickPacer::new(&config),
            config,
        }
    }

    /// Returns the number of update ticks executed so far.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns the tick configuration.
    #[must_use]
    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    /// Run the start phase once.
    pub fn start<A>(&mut self, registry: &mut SystemRegistry<A>, world: &mut World, args: &A) -> bool {
        let ok = registry.run_phase(world, Phase::OnStart, args);
        info!(ok, "start phase finished");
        ok
    }

    /// Run one update tick, pacing it to the configured rate.
    pub fn update<A>(&mut self, registry: &mut SystemRegistry<A>, world: &mut World, args: &A) -> bool {
        let started = Instant::now();
        self.tick_id += 1;
        let ok = registry.run_phase(world, Phase::OnUpdate, args);
        debug!(tick_id = self.tick_id, ok, "update tick finished");
        self.pacer.pace(self.tick_id, started);
        ok
    }

    /// Run the exit phase once.
    pub fn exit<A>(&mut self, registry: &mut SystemRegistry<A>, world: &mut World, args: &A) -> bool {
        let ok = registry.run_phase(world, Phase::OnExit, args);
        info!(ok, "exit phase finished");
        ok
    }

    /// Run the full lifecycle.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::StartFailed`] if the start phase failed, otherwise
    /// [`RunError::ExitFailed`] if the exit phase failed. A failing update
    /// tick only ends the loop and is not an error.
    pub fn run<A>(
        &mut self,
        registry: &mut SystemRegistry<A>,
        world: &mut World,
        args: &A,
    ) -> Result<RunSummary, RunError> {
        let first_tick = self.tick_id;
        let start_ok = self.start(registry, world, args);

        let stop_reason = if start_ok {
            loop {
                if self.config.limit_reached(self.tick_id - first_tick) {
                    break StopReason::TickLimit;
                }
                if !self.update(registry, world, args) {
                    break StopReason::UpdateFailed;
                }
            }
        } else {
            warn!("start phase failed, skipping update loop");
            StopReason::StartFailed
        };

        let exit_ok = self.exit(registry, world, args);
        let summary = RunSummary {
            ticks: self.tick_id - first_tick,
            stop_reason,
            start_ok,
            exit_ok,
        };
        info!(ticks = summary.ticks, %stop_reason, exit_ok, "run finished");

        if !start_ok {
            Err(RunError::StartFailed(summary))
        } else if !exit_ok {
            Err(RunError::ExitFailed(summary))
        } else {
            Ok(summary)
        }
    }
}
