//! Tick scheduler - advances the logical clock and runs registered systems
//!
//! One `advance(n)` call executes n fully sequential steps. Each step
//! increments the clock, builds a shared tick context (tick number, clock,
//! RNG registry, event bus) and invokes every registered system exactly
//! once, strictly in registration order. No system runs concurrently with
//! another and no step starts before the previous one, including all its
//! nested event dispatches, has completed.

use std::sync::Arc;

use crate::core::clock::SimClock;
use crate::core::error::{SimError, SimResult};
use crate::core::events::EventBus;
use crate::core::rng::RngRegistry;
use crate::world::data::WorldState;

/// Shared per-step context handed to every system.
pub struct TickContext<'a> {
    /// Tick value for this step (clock has already been advanced).
    pub tick: u64,
    pub clock: &'a SimClock,
    pub rng: &'a RngRegistry,
    pub bus: &'a EventBus,
}

/// A simulation system driven by the scheduler.
pub trait TickSystem: Send {
    fn tick(&mut self, world: &mut WorldState, ctx: &TickContext<'_>) -> SimResult<()>;
}

/// Opaque registration handle.
///
/// Boxed systems have no reference identity, so unregistration goes through
/// the id returned at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(u64);

/// Deterministic tick scheduler.
pub struct TickScheduler {
    clock: SimClock,
    rng: Arc<RngRegistry>,
    bus: Arc<EventBus>,
    systems: Vec<(SystemId, Box<dyn TickSystem>)>,
    next_system_id: u64,
}

impl TickScheduler {
    pub fn new(clock: SimClock, rng: Arc<RngRegistry>, bus: Arc<EventBus>) -> Self {
        Self {
            clock,
            rng,
            bus,
            systems: Vec::new(),
            next_system_id: 0,
        }
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn rng(&self) -> &Arc<RngRegistry> {
        &self.rng
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Append a system to the end of the run order.
    pub fn register_system(&mut self, system: Box<dyn TickSystem>) -> SystemId {
        let id = SystemId(self.next_system_id);
        self.next_system_id += 1;
        self.systems.push((id, system));
        id
    }

    /// Remove exactly the registration identified by `id`.
    ///
    /// Returns false when the id is unknown (or already unregistered).
    pub fn unregister_system(&mut self, id: SystemId) -> bool {
        let before = self.systems.len();
        self.systems.retain(|(system_id, _)| *system_id != id);
        self.systems.len() != before
    }

    /// Advance the simulation by `ticks` steps.
    ///
    /// Rejects `ticks == 0`. A system error aborts the advance; the clock
    /// keeps the value of the step that failed.
    pub fn advance(&mut self, world: &mut WorldState, ticks: u64) -> SimResult<()> {
        if ticks == 0 {
            return Err(SimError::InvalidArgument(
                "advance requires a positive tick count".to_string(),
            ));
        }

        for _ in 0..ticks {
            self.clock.advance_ticks(1);
            let Self {
                clock,
                rng,
                bus,
                systems,
                ..
            } = self;
            let ctx = TickContext {
                tick: clock.current_tick(),
                clock: &*clock,
                rng: &**rng,
                bus: &**bus,
            };
            for (_, system) in systems.iter_mut() {
                system.tick(world, &ctx)?;
            }
        }

        Ok(())
    }
}
