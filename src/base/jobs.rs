//! Job scheduling system
//!
//! Second system each tick. Spends workforce capacity on the job board in
//! priority order and applies type-specific outcomes for everything that
//! finished: maintenance repairs zones, production fills the inventory,
//! research advances the active project, patrols push raid threat down.

use crate::base::runtime::{JobOutcome, JobType};
use crate::base::{adjust_infrastructure, BaseCx, BaseSystem, JobCompleted};
use crate::core::error::SimResult;
use crate::world::data::{BaseState, ItemStack, ZoneType};

pub struct JobSchedulingSystem;

impl BaseSystem for JobSchedulingSystem {
    fn name(&self) -> &'static str {
        "jobs"
    }

    fn run(&mut self, cx: &mut BaseCx<'_>) -> SimResult<()> {
        let workforce = cx.world.base_state.population.len().max(1);

        let mut completed = Vec::new();
        cx.runtime.job_board.advance(workforce, &mut completed);

        for outcome in &completed {
            apply_job_outcome(outcome, cx)?;
            tracing::debug!(job = %outcome.id, kind = ?outcome.job_type, "job completed");
            cx.bus.publish(JobCompleted {
                job: outcome.clone(),
                tick: cx.tick,
            });
        }

        cx.runtime.record_completed_jobs(completed);
        Ok(())
    }
}

fn apply_job_outcome(outcome: &JobOutcome, cx: &mut BaseCx<'_>) -> SimResult<()> {
    match outcome.job_type {
        JobType::Maintenance => apply_maintenance(outcome, cx),
        JobType::Production => apply_production(outcome, cx)?,
        JobType::Research => apply_research(cx)?,
        JobType::Patrol => apply_patrol(cx),
    }
    Ok(())
}

fn apply_maintenance(outcome: &JobOutcome, cx: &mut BaseCx<'_>) {
    if let Some(zone_id) = &outcome.zone_id {
        if let Some(zone_runtime) = cx.runtime.zones.get_mut(zone_id) {
            zone_runtime.wear = (zone_runtime.wear - 0.2).clamp(0.0, 1.0);
            if let Some(zone) = cx
                .world
                .base_state
                .zones
                .iter_mut()
                .find(|z| &z.id == zone_id)
            {
                zone.efficiency = (zone.efficiency + 0.04).clamp(0.3, 1.4);
            }
        }
    }

    adjust_infrastructure(&mut cx.world.base_state.infrastructure, "morale", 0.05, 0.5);
}

fn apply_production(outcome: &JobOutcome, cx: &mut BaseCx<'_>) -> SimResult<()> {
    let zone_key = outcome.zone_id.as_deref().unwrap_or("global");
    let channel = cx.channel(&format!("Production.{}", zone_key))?;
    let yielded = 2 + channel.next_int(0, 3)?;

    let is_farm = outcome
        .zone_id
        .as_ref()
        .and_then(|zone_id| {
            cx.world
                .base_state
                .zones
                .iter()
                .find(|z| &z.id == zone_id)
        })
        .map(|zone| zone.r#type == ZoneType::Farm)
        .unwrap_or(false);
    let item_id = if is_farm { "supply_food" } else { "supply_basic" };

    add_to_inventory(&mut cx.world.base_state, item_id, yielded);
    adjust_infrastructure(&mut cx.world.base_state.infrastructure, "power", 0.02, 0.5);
    Ok(())
}

fn apply_research(cx: &mut BaseCx<'_>) -> SimResult<()> {
    let research = &mut cx.world.base_state.research;
    if research.active_project_id.is_none() {
        research.active_progress = 0.0;
        return Ok(());
    }

    let channel = cx.channel("research.progress")?;
    let delta = 0.1 + channel.next_float01() as f32 * 0.05;

    let research = &mut cx.world.base_state.research;
    research.active_progress = (research.active_progress + delta).clamp(0.0, 1.0);

    if research.active_progress >= 0.999 {
        if let Some(project_id) = research.active_project_id.take() {
            tracing::info!(project = %project_id, "research project completed");
            research.completed_projects.push(project_id);
        }
        research.active_progress = 0.0;
    }
    Ok(())
}

fn apply_patrol(cx: &mut BaseCx<'_>) {
    let threat = &mut cx.runtime.raid_threat.threat_meter;
    *threat = (*threat - 0.12).clamp(0.0, 1.0);
    adjust_infrastructure(&mut cx.world.base_state.infrastructure, "defense", 0.05, 0.5);
}

fn add_to_inventory(state: &mut BaseState, item_id: &str, quantity: i64) {
    match state
        .inventory
        .iter_mut()
        .find(|stack| stack.item_id == item_id)
    {
        Some(stack) => stack.quantity += quantity,
        None => state.inventory.push(ItemStack {
            item_id: item_id.to_string(),
            quantity,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::runtime::{BaseRuntime, Job, JobPriority};
    use crate::core::events::EventBus;
    use crate::core::rng::RngRegistry;
    use crate::testutil::sample_world;
    use crate::world::data::{BaseZone, WorldState};
    use std::sync::{Arc, Mutex};

    fn run_system(world: &mut WorldState, runtime: &mut BaseRuntime, bus: &EventBus, tick: u64) {
        let rng = RngRegistry::new(world.seed);
        let mut cx = BaseCx {
            world,
            runtime,
            tick,
            bus,
            rng: &rng,
        };
        JobSchedulingSystem.run(&mut cx).unwrap();
    }

    fn one_hour_job(id: &str, job_type: JobType, zone_id: Option<&str>) -> Job {
        Job {
            id: id.to_string(),
            job_type,
            priority: JobPriority::Normal,
            zone_id: zone_id.map(|z| z.to_string()),
            duration_hours: 1,
            remaining_hours: 1,
            repeatable: false,
        }
    }

    #[test]
    fn test_completion_publishes_event() {
        let mut world = sample_world();
        let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
        runtime
            .job_board
            .enqueue(one_hour_job("job_x", JobType::Patrol, None));

        let bus = EventBus::new();
        let completions = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&completions);
        let _sub = bus.subscribe::<JobCompleted, _>(move |e| {
            sink.lock().unwrap().push(e.job.id.clone());
        });

        run_system(&mut world, &mut runtime, &bus, 1);
        assert_eq!(*completions.lock().unwrap(), vec!["job_x"]);
        assert_eq!(runtime.recently_completed_jobs.len(), 1);
    }

    #[test]
    fn test_maintenance_repairs_zone() {
        let mut world = sample_world();
        let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
        runtime.zones.get_mut("zone_hab").unwrap().wear = 0.9;
        world.base_state.zones[0].efficiency = 1.0;
        runtime
            .job_board
            .enqueue(one_hour_job("job_m", JobType::Maintenance, Some("zone_hab")));

        let bus = EventBus::new();
        run_system(&mut world, &mut runtime, &bus, 1);

        assert!((runtime.zones["zone_hab"].wear - 0.7).abs() < 1e-6);
        assert!((world.base_state.zones[0].efficiency - 1.04).abs() < 1e-6);
        assert!(world.base_state.infrastructure["morale"] > 0.5);
    }

    #[test]
    fn test_maintenance_with_dangling_zone_is_noop_for_zone() {
        let mut world = sample_world();
        let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
        runtime
            .job_board
            .enqueue(one_hour_job("job_m", JobType::Maintenance, Some("zone_gone")));

        let bus = EventBus::new();
        run_system(&mut world, &mut runtime, &bus, 1);

        // Zone effects skipped, but the morale bump still lands.
        assert!(world.base_state.infrastructure.contains_key("morale"));
    }

    #[test]
    fn test_production_farm_yields_food() {
        let mut world = sample_world();
        world.base_state.zones.push(BaseZone {
            id: "zone_farm".into(),
            name: "Farm".into(),
            r#type: ZoneType::Farm,
            efficiency: 1.0,
        });
        let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
        runtime
            .job_board
            .enqueue(one_hour_job("job_p", JobType::Production, Some("zone_farm")));

        let bus = EventBus::new();
        run_system(&mut world, &mut runtime, &bus, 1);

        let food = world
            .base_state
            .inventory
            .iter()
            .find(|s| s.item_id == "supply_food")
            .expect("farm production should yield food");
        assert!((2..=4).contains(&food.quantity));
    }

    #[test]
    fn test_production_elsewhere_yields_basic_supply() {
        let mut world = sample_world();
        let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
        runtime
            .job_board
            .enqueue(one_hour_job("job_p", JobType::Production, None));

        let bus = EventBus::new();
        run_system(&mut world, &mut runtime, &bus, 1);

        assert!(world
            .base_state
            .inventory
            .iter()
            .any(|s| s.item_id == "supply_basic"));
    }

    #[test]
    fn test_research_without_project_resets_progress() {
        let mut world = sample_world();
        world.base_state.research.active_project_id = None;
        world.base_state.research.active_progress = 0.7;
        let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
        runtime
            .job_board
            .enqueue(one_hour_job("job_r", JobType::Research, None));

        let bus = EventBus::new();
        run_system(&mut world, &mut runtime, &bus, 1);

        assert_eq!(world.base_state.research.active_progress, 0.0);
        assert!(world.base_state.research.completed_projects.len() == 1);
    }

    #[test]
    fn test_research_completes_project_at_threshold() {
        let mut world = sample_world();
        world.base_state.research.active_progress = 0.95;
        let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
        runtime
            .job_board
            .enqueue(one_hour_job("job_r", JobType::Research, None));

        let bus = EventBus::new();
        run_system(&mut world, &mut runtime, &bus, 1);

        let research = &world.base_state.research;
        assert!(research.active_project_id.is_none());
        assert_eq!(research.active_progress, 0.0);
        assert!(research
            .completed_projects
            .iter()
            .any(|p| p == "tech_drills"));
    }

    #[test]
    fn test_patrol_reduces_threat_and_raises_defense() {
        let mut world = sample_world();
        let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
        runtime.raid_threat.threat_meter = 0.5;
        runtime
            .job_board
            .enqueue(one_hour_job("job_w", JobType::Patrol, None));

        let bus = EventBus::new();
        run_system(&mut world, &mut runtime, &bus, 1);

        assert!((runtime.raid_threat.threat_meter - 0.38).abs() < 1e-6);
        assert!((world.base_state.infrastructure["defense"] - 0.55).abs() < 1e-6);
    }

    #[test]
    fn test_workforce_caps_processing() {
        let mut world = sample_world();
        // One resident: only the highest-priority job advances.
        let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
        runtime
            .job_board
            .enqueue(one_hour_job("job_a", JobType::Patrol, None));
        runtime
            .job_board
            .enqueue(one_hour_job("job_b", JobType::Patrol, None));

        let bus = EventBus::new();
        run_system(&mut world, &mut runtime, &bus, 1);

        assert_eq!(runtime.recently_completed_jobs.len(), 1);
        assert_eq!(runtime.recently_completed_jobs[0].id, "job_a");
    }
}
