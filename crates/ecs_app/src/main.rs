//! # ecs_app demo
//!
//! Seeds a few named entities, greets every entity that holds both a `Name`
//! and an `Age`, hands out a first birthday to the ones without an age, and
//! runs until Ctrl-C (or `--max-ticks`).

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ecs_app::{Ecs, TickConfig};
use ecs_component::{Component, Entity, Query};
use ecs_system::{
    FnSystem, InitContext, Membership, MembershipChange, ShutdownSignal, ShutdownSystem, System,
    SystemError, World,
};

#[derive(Parser)]
#[command(name = "ecs_app", about = "Reactive ECS greeting demo")]
struct Args {
    /// Update ticks per second (0 = unpaced)
    #[arg(short, long, env = "ECS_TICK_RATE", default_value_t = 60.0)]
    tick_rate: f64,

    /// Stop after this many update ticks (0 = unlimited)
    #[arg(short, long, env = "ECS_MAX_TICKS", default_value_t = 0)]
    max_ticks: u64,

    /// Word used to greet people
    #[arg(short, long, default_value = "Hello")]
    salutation: String,
}

/// Per-run arguments handed to every system.
#[derive(Debug)]
struct Greeting {
    salutation: String,
}

#[derive(Debug)]
struct Name(String);

impl Component for Name {
    fn type_name() -> &'static str {
        "Name"
    }
}

#[derive(Debug)]
struct Age(u32);

impl Component for Age {
    fn type_name() -> &'static str {
        "Age"
    }
}

/// Greets people as soon as they have both a name and an age.
#[derive(Default)]
struct Introducer {
    members: Option<Membership>,
    arrivals: Arc<Mutex<Vec<Entity>>>,
}

impl System<Greeting> for Introducer {
    fn name(&self) -> &str {
        "introducer"
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), SystemError> {
        let arrivals = Arc::clone(&self.arrivals);
        let members = Membership::with_observer(
            Query::new().with::<Name>().with::<Age>(),
            move |change| {
                if let MembershipChange::Entered(entity) = change {
                    arrivals
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(entity);
                }
            },
        );
        members.subscribe(ctx);
        // Backfilled members are not observed; greet them on the first tick.
        self.arrivals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(members.entities());
        self.members = Some(members);
        Ok(())
    }

    fn run(&mut self, world: &mut World, args: &Greeting) -> bool {
        let arrivals: Vec<Entity> = self
            .arrivals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        let store = world.store();
        for entity in arrivals {
            match (store.get::<Name>(entity), store.get::<Age>(entity)) {
                (Ok(name), Ok(age)) => {
                    info!(%entity, "{}, {}! You are {}.", args.salutation, name.0, age.0);
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!(%entity, error = %e, "cannot greet");
                    return false;
                }
            }
        }
        true
    }
}

/// Gives every nameable entity without an age its first birthday on the
/// given tick.
struct Birthday {
    on_tick: u64,
    ticks: u64,
}

impl System<Greeting> for Birthday {
    fn name(&self) -> &str {
        "birthday"
    }

    fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), SystemError> {
        Ok(())
    }

    fn run(&mut self, world: &mut World, _args: &Greeting) -> bool {
        self.ticks += 1;
        if self.ticks != self.on_tick {
            return true;
        }
        let ageless: Vec<Entity> = Query::new()
            .with::<Name>()
            .run(world.store())
            .into_iter()
            .filter(|&e| !world.store().has_component(e, Age::type_name()))
            .collect();
        for entity in ageless {
            info!(%entity, "first birthday");
            if let Err(e) = world.add_component(entity, Age(1)) {
                warn!(%entity, error = %e, "birthday failed");
                return false;
            }
        }
        true
    }
}

fn build(signal: ShutdownSignal, config: TickConfig) -> Result<Ecs<Greeting>> {
    let mut ecs = Ecs::with_config(config).with_shutdown(signal);

    for (name, age) in [("John", Some(42)), ("Ada", None), ("Grace", Some(85))] {
        let entity = match age {
            Some(age) => ecs.new_entity(vec![Arc::new(Name(name.into())), Arc::new(Age(age))]),
            None => ecs.new_entity(vec![Arc::new(Name(name.into()))]),
        }?;
        info!(%entity, name, "seeded");
    }

    ecs.on_start(FnSystem::new("greeter", |world: &mut World, _: &Greeting| {
        info!(entities = world.entity_count(), "world ready");
        true
    }))?
    .on_update(Introducer::default())?
    .on_update(Birthday {
        on_tick: 3,
        ticks: 0,
    })?
    .on_update(ShutdownSystem::new())?
    .on_exit(FnSystem::new("farewell", |_: &mut World, args: &Greeting| {
        info!("{} and goodbye.", args.salutation);
        true
    }))?;

    Ok(ecs)
}

fn tick_config(args: &Args) -> Result<TickConfig> {
    let config = TickConfig::default()
        .with_tick_rate(args.tick_rate)
        .with_max_ticks(args.max_ticks);
    if !config.is_valid_rate() {
        bail!("tick rate {} has no usable tick budget", args.tick_rate);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = tick_config(&args)?;
    info!(tick_rate = config.tick_rate, max_ticks = config.max_ticks, "ecs demo starting");

    let signal = ShutdownSignal::new();
    let listener = signal.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received");
                listener.request();
            }
            Err(e) => warn!(error = %e, "cannot listen for interrupts"),
        }
    });

    let greeting = Greeting {
        salutation: args.salutation,
    };
    let summary = tokio::task::spawn_blocking(move || -> Result<_> {
        let mut ecs = build(signal, config)?;
        Ok(ecs.run(&greeting)?)
    })
    .await
    .context("run task panicked")??;

    info!(ticks = summary.ticks, stop_reason = %summary.stop_reason, "ecs demo finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_default_args_are_paced() {
        let args = Args::try_parse_from(["ecs_app"]).unwrap();
        let config = tick_config(&args).unwrap();
        assert_eq!(config.tick_budget(), Some(Duration::from_secs_f64(1.0 / 60.0)));
        assert_eq!(config.max_ticks, 0);
    }

    #[test]
    fn test_flags_override_defaults() {
        let args =
            Args::try_parse_from(["ecs_app", "--tick-rate", "0", "--max-ticks", "5"]).unwrap();
        let config = tick_config(&args).unwrap();
        assert!(config.tick_budget().is_none());
        assert_eq!(config.max_ticks, 5);
    }

    #[test]
    fn test_unusable_rate_is_rejected() {
        let args = Args::try_parse_from(["ecs_app", "--tick-rate", "1e-300"]).unwrap();
        assert!(tick_config(&args).is_err());
    }
}
