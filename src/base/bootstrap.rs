//! Base-mode composition root
//!
//! Builds the runtime from persistent state, seeds the initial jobs and
//! mandates, wires the default system stack into the scheduler and hands
//! back the command dispatcher. No global registries anywhere: every
//! collaborator is passed down explicitly.

use std::sync::Arc;

use crate::base::command::IndirectCommandDispatcher;
use crate::base::jobs::JobSchedulingSystem;
use crate::base::mandates::MandateResolutionSystem;
use crate::base::oracle::OracleIncidentSystem;
use crate::base::raids::RaidThreatSystem;
use crate::base::runtime::BaseRuntime;
use crate::base::zones::ZoneMaintenanceSystem;
use crate::base::{BaseSimulation, BaseSystem};
use crate::core::config::SimConfig;
use crate::core::error::SimResult;
use crate::core::events::EventBus;
use crate::sim::scheduler::{SystemId, TickScheduler};
use crate::world::data::WorldState;
use crate::world::normalize::normalize;

/// Published once the base simulation loop is registered and ready.
#[derive(Debug, Clone)]
pub struct BaseSessionStarted {
    pub site_tile_id: String,
}

/// Handles returned by [`bootstrap_base`].
pub struct BaseSession {
    pub system_id: SystemId,
    pub dispatcher: IndirectCommandDispatcher,
}

/// The default base-mode system stack, in its fixed run order.
pub fn default_systems(bus: &EventBus, world: &WorldState) -> Vec<Box<dyn BaseSystem>> {
    vec![
        Box::new(ZoneMaintenanceSystem),
        Box::new(JobSchedulingSystem),
        Box::new(RaidThreatSystem),
        Box::new(MandateResolutionSystem),
        Box::new(OracleIncidentSystem::new(bus, world)),
    ]
}

/// Activate the base, build its runtime and register the simulation loop.
pub fn bootstrap_base(
    world: &mut WorldState,
    scheduler: &mut TickScheduler,
    config: &SimConfig,
) -> SimResult<BaseSession> {
    config.validate()?;

    normalize(world);
    world.base_state.active = true;

    let mut runtime = BaseRuntime::new(&world.base_state, config.hours_per_day)?;
    runtime.incident_cooldown = config.incident_cooldown;
    runtime.seed_initial_jobs(&world.base_state);
    runtime.seed_initial_mandates(world, &world.base_state);

    let systems = default_systems(scheduler.bus(), world);
    let simulation = BaseSimulation::new(runtime, systems)?;
    let system_id = scheduler.register_system(Box::new(simulation));

    let dispatcher = IndirectCommandDispatcher::new(
        Arc::clone(scheduler.bus()),
        config.command_history_limit,
    )?;

    tracing::info!(site = %world.base_state.site_tile_id, "base session started");
    scheduler.bus().publish(BaseSessionStarted {
        site_tile_id: world.base_state.site_tile_id.clone(),
    });

    Ok(BaseSession {
        system_id,
        dispatcher,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::SimClock;
    use crate::core::rng::RngRegistry;
    use crate::testutil::sample_world;
    use std::sync::Mutex;

    fn scheduler_for(world: &WorldState) -> TickScheduler {
        TickScheduler::new(
            SimClock::new(1, 24).unwrap(),
            Arc::new(RngRegistry::new(world.seed)),
            Arc::new(EventBus::new()),
        )
    }

    #[test]
    fn test_bootstrap_seeds_runtime_and_registers_loop() {
        let mut world = sample_world();
        world.base_state.active = false;
        let mut scheduler = scheduler_for(&world);

        let started = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&started);
        let _sub = scheduler.bus().subscribe::<BaseSessionStarted, _>(move |e| {
            sink.lock().unwrap().push(e.site_tile_id.clone());
        });

        let session = bootstrap_base(&mut world, &mut scheduler, &SimConfig::default()).unwrap();

        assert!(world.base_state.active);
        assert_eq!(*started.lock().unwrap(), vec!["tile_0_0"]);
        assert_eq!(session.dispatcher.recent_commands().count(), 0);

        // The registered loop advances without error.
        scheduler.advance(&mut world, 1).unwrap();
        assert_eq!(scheduler.clock().current_tick(), 1);
    }

    #[test]
    fn test_bootstrap_rejects_invalid_config() {
        let mut world = sample_world();
        let mut scheduler = scheduler_for(&world);
        let config = SimConfig {
            hours_per_day: 0,
            ..SimConfig::default()
        };
        assert!(bootstrap_base(&mut world, &mut scheduler, &config).is_err());
    }
}
