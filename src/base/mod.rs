//! Base-mode simulation
//!
//! The stateful heart of base management: zone upkeep, job scheduling, raid
//! pressure, mandates and oracle incidents, run once per tick in that fixed
//! order by [`BaseSimulation`]. Systems consume and mutate the world
//! snapshot, draw entropy through per-tick reseeded RNG channels and talk
//! to each other (and to any UI) only through the event bus.

pub mod bootstrap;
pub mod command;
pub mod jobs;
pub mod mandates;
pub mod oracle;
pub mod raids;
pub mod runtime;
pub mod zones;

use std::collections::BTreeMap;

use crate::core::error::{SimError, SimResult};
use crate::core::events::EventBus;
use crate::core::rng::{combine_seed, fnv1a, RngChannel, RngRegistry};
use crate::sim::scheduler::{TickContext, TickSystem};
use crate::world::data::{EventEffect, WorldState};
use crate::world::normalize::normalize;

pub use runtime::{
    BaseRuntime, Job, JobBoard, JobOutcome, JobPriority, JobType, Mandate, MandateResolution,
    MandateStatus, MandateTracker, MandateType, RaidThreatState, ZoneRuntime,
};

/// Per-tick context handed to every base-mode system.
pub struct BaseCx<'a> {
    pub world: &'a mut WorldState,
    pub runtime: &'a mut BaseRuntime,
    pub tick: u64,
    pub bus: &'a EventBus,
    rng: &'a RngRegistry,
}

impl BaseCx<'_> {
    pub fn hours_per_day(&self) -> u64 {
        self.runtime.hours_per_day()
    }

    /// Fetch the channel `base.<name>`, reseeded for this tick.
    ///
    /// The reseed offset combines the world seed's low 32 bits, the tick's
    /// low 32 bits and the name hash, so a system's draws depend only on
    /// (seed, tick, name) - never on what other systems drew first.
    pub fn channel(&self, name: &str) -> SimResult<RngChannel> {
        if name.trim().is_empty() {
            return Err(SimError::InvalidArgument(
                "channel name must be provided".to_string(),
            ));
        }
        let channel = self.rng.channel(&format!("base.{}", name))?;
        let offset = combine_seed(&[
            self.world.seed & 0xFFFF_FFFF,
            self.tick & 0xFFFF_FFFF,
            fnv1a(name.as_bytes()),
        ]);
        channel.reseed(offset as i64);
        Ok(channel)
    }
}

/// One of the fixed-order base-mode systems.
pub trait BaseSystem: Send {
    fn name(&self) -> &'static str;
    fn run(&mut self, cx: &mut BaseCx<'_>) -> SimResult<()>;
}

/// Tick-scheduler entry point for base mode.
///
/// Skips inactive bases, runs its systems in registration order, then
/// normalizes the world and announces the completed tick.
pub struct BaseSimulation {
    runtime: BaseRuntime,
    systems: Vec<Box<dyn BaseSystem>>,
}

impl BaseSimulation {
    pub fn new(runtime: BaseRuntime, systems: Vec<Box<dyn BaseSystem>>) -> SimResult<Self> {
        if systems.is_empty() {
            return Err(SimError::InvalidArgument(
                "at least one base mode system must be provided".to_string(),
            ));
        }
        Ok(Self { runtime, systems })
    }

    pub fn runtime(&self) -> &BaseRuntime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut BaseRuntime {
        &mut self.runtime
    }
}

impl TickSystem for BaseSimulation {
    fn tick(&mut self, world: &mut WorldState, ctx: &TickContext<'_>) -> SimResult<()> {
        if !world.base_state.active {
            return Ok(());
        }

        {
            let mut cx = BaseCx {
                world: &mut *world,
                runtime: &mut self.runtime,
                tick: ctx.tick,
                bus: ctx.bus,
                rng: ctx.rng,
            };
            for system in &mut self.systems {
                system.run(&mut cx)?;
            }
        }

        normalize(world);
        ctx.bus.publish(BaseTickCompleted { tick: ctx.tick });
        Ok(())
    }
}

/// Clamp-adjust one infrastructure stat, seeding absent keys at `default`.
pub(crate) fn adjust_infrastructure(
    infrastructure: &mut BTreeMap<String, f32>,
    key: &str,
    delta: f32,
    default: f32,
) {
    let value = infrastructure.get(key).copied().unwrap_or(default);
    infrastructure.insert(key.to_string(), (value + delta).clamp(0.0, 1.5));
}

// === Events published by base-mode systems ===

/// A job finished this tick.
#[derive(Debug, Clone)]
pub struct JobCompleted {
    pub job: JobOutcome,
    pub tick: u64,
}

/// Raid threat crossed the scheduling threshold.
#[derive(Debug, Clone)]
pub struct RaidScheduled {
    pub attacker_faction_id: String,
    pub hours_until_raid: i64,
}

/// A scheduled raid landed and was resolved.
#[derive(Debug, Clone)]
pub struct RaidResolved {
    pub event_id: String,
    pub attacker_faction_id: String,
}

/// A mandate reached a terminal state on a day boundary.
#[derive(Debug, Clone)]
pub struct MandateResolved {
    pub mandate: Mandate,
    pub result: MandateStatus,
    pub tick: u64,
}

/// An oracle card was drawn in response to a raid or mandate outcome.
///
/// Carries a deep clone of the card's effect list; consumers may mutate it
/// freely without aliasing the deck template.
#[derive(Debug, Clone)]
pub struct OracleIncidentInjected {
    pub deck_id: String,
    pub card_id: String,
    pub narrative: String,
    pub trigger: String,
    pub trigger_parameters: BTreeMap<String, String>,
    pub effects: Vec<EventEffect>,
    pub tick: u64,
}

/// All base-mode systems have run and the world has been normalized.
#[derive(Debug, Clone, Copy)]
pub struct BaseTickCompleted {
    pub tick: u64,
}
