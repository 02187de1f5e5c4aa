//! Tick configuration and pacing.
//!
//! By default the update loop runs unpaced and unbounded: it only stops when
//! a tick's update phase fails. A [`TickConfig`] can pace the loop to a
//! fixed rate and cap the number of ticks.

use std::time::{Duration, Instant};

use tracing::warn;

/// Environment variable overriding [`TickConfig::tick_rate`].
pub const TICK_RATE_ENV: &str = "ECS_TICK_RATE";

/// Environment variable overriding [`TickConfig::max_ticks`].
pub const MAX_TICKS_ENV: &str = "ECS_MAX_TICKS";

/// Configuration for the update loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TickConfig {
    /// Target ticks per second (0 = unpaced).
    pub tick_rate: f64,
    /// Maximum number of update ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 0.0,
            max_ticks: 0,
        }
    }
}

impl TickConfig {
    /// Read the configuration from [`TICK_RATE_ENV`] and [`MAX_TICKS_ENV`],
    /// falling back to the defaults for unset or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let mut config = Self {
            tick_rate: parse_or(&lookup, TICK_RATE_ENV, defaults.tick_rate),
            max_ticks: parse_or(&lookup, MAX_TICKS_ENV, defaults.max_ticks),
        };
        if !config.is_valid_rate() {
            warn!(key = TICK_RATE_ENV, tick_rate = config.tick_rate, "ignoring unusable tick rate");
            config.tick_rate = defaults.tick_rate;
        }
        config
    }

    /// Returns `true` if the tick rate is zero or yields a representable
    /// tick budget.
    #[must_use]
    pub fn is_valid_rate(&self) -> bool {
        self.tick_rate == 0.0 || self.tick_budget().is_some()
    }

    /// Override the tick rate.
    #[must_use]
    pub fn with_tick_rate(mut self, tick_rate: f64) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Override the tick cap.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Returns the time budget of one tick, or `None` when unpaced or when
    /// the rate has no representable budget.
    #[must_use]
    pub fn tick_budget(&self) -> Option<Duration> {
        if !(self.tick_rate.is_finite() && self.tick_rate > 0.0) {
            return None;
        }
        Duration::try_from_secs_f64(1.0 / self.tick_rate).ok()
    }

    /// Returns `true` once `ticks` has reached the configured cap.
    #[must_use]
    pub fn limit_reached(&self, ticks: u64) -> bool {
        self.max_ticks > 0 && ticks >= self.max_ticks
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable setting");
            default
        }
    }
}

/// Sleeps away the remainder of each tick's budget.
#[derive(Debug, Clone, Copy)]
pub struct TickPacer {
    budget: Option<Duration>,
}

impl TickPacer {
    /// Create a pacer for `config`.
    #[must_use]
    pub fn new(config: &TickConfig) -> Self {
        Self {
            budget: config.tick_budget(),
        }
    }

    /// Wait out the rest of the tick that began at `started`.
    pub fn pace(&self, tick_id: u64, started: Instant) {
        let Some(budget) = self.budget else {
            return;
        };
        let elapsed = started.elapsed();
        if elapsed < budget {
            std::thread::sleep(budget - elapsed);
        } else {
            warn!(
                tick_id,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = budget.as_millis() as u64,
                "tick exceeded time budget"
            );
        }
    }
}
