//! Mandate resolution system
//!
//! Fourth system each tick, but it only fires on day boundaries. Resolved
//! mandates apply their type-specific rewards or penalties, log a world
//! event, notify the oracle synchronizer and, on completion, chain a
//! follow-up mandate with a pushed-out deadline.

use crate::base::runtime::{MandateResolution, MandateStatus, MandateType};
use crate::base::{adjust_infrastructure, oracle, BaseCx, BaseSystem, MandateResolved};
use crate::core::error::SimResult;
use crate::world::data::{AlertLevel, EventRecord, EventType, ItemStack};

pub struct MandateResolutionSystem;

impl BaseSystem for MandateResolutionSystem {
    fn name(&self) -> &'static str {
        "mandates"
    }

    fn run(&mut self, cx: &mut BaseCx<'_>) -> SimResult<()> {
        let completed_jobs = cx.runtime.recently_completed_jobs.clone();
        let resolutions = cx.runtime.mandate_tracker.advance(&completed_jobs);

        for resolution in resolutions {
            apply_resolution_effects(&resolution, cx);
            log_resolution_event(&resolution, cx);
            tracing::info!(
                mandate = %resolution.mandate.id,
                result = resolution.result.as_str(),
                "mandate resolved"
            );
            cx.bus.publish(MandateResolved {
                mandate: resolution.mandate.clone(),
                result: resolution.result,
                tick: cx.tick,
            });
            oracle::record_mandate_outcome(cx, &resolution)?;

            if resolution.result == MandateStatus::Completed {
                cx.runtime
                    .mandate_tracker
                    .enqueue_follow_up(&resolution.mandate, cx.tick);
            }
        }

        Ok(())
    }
}

fn apply_resolution_effects(resolution: &MandateResolution, cx: &mut BaseCx<'_>) {
    match resolution.result {
        MandateStatus::Completed => apply_completion(resolution, cx),
        MandateStatus::Failed => apply_failure(cx),
        MandateStatus::Active => {}
    }
}

fn apply_completion(resolution: &MandateResolution, cx: &mut BaseCx<'_>) {
    match resolution.mandate.mandate_type {
        MandateType::Infrastructure => {
            let infrastructure = &mut cx.world.base_state.infrastructure;
            adjust_infrastructure(infrastructure, "water", 0.08, 0.4);
            adjust_infrastructure(infrastructure, "morale", 0.05, 0.4);
        }
        MandateType::Production => {
            match cx
                .world
                .base_state
                .inventory
                .iter_mut()
                .find(|stack| stack.item_id == "supply_refined")
            {
                Some(stack) => stack.quantity += 4,
                None => cx.world.base_state.inventory.push(ItemStack {
                    item_id: "supply_refined".to_string(),
                    quantity: 4,
                }),
            }
            adjust_infrastructure(&mut cx.world.base_state.infrastructure, "power", 0.05, 0.4);
        }
        MandateType::Defense => {
            adjust_infrastructure(&mut cx.world.base_state.infrastructure, "defense", 0.1, 0.4);
            cx.world.base_state.alert_level = AlertLevel::Elevated;
        }
        MandateType::Research => {
            let research = &mut cx.world.base_state.research;
            if let Some(project_id) = research.active_project_id.take() {
                research.completed_projects.push(project_id);
                research.active_progress = 0.0;
            }
        }
    }
}

fn apply_failure(cx: &mut BaseCx<'_>) {
    let infrastructure = &mut cx.world.base_state.infrastructure;
    adjust_infrastructure(infrastructure, "morale", -0.08, 0.4);
    adjust_infrastructure(infrastructure, "defense", -0.05, 0.4);
}

fn log_resolution_event(resolution: &MandateResolution, cx: &mut BaseCx<'_>) {
    let mandate = &resolution.mandate;
    let actors = if mandate.issuer_character_id.is_empty() {
        Vec::new()
    } else {
        vec![mandate.issuer_character_id.clone()]
    };

    cx.world.events.push(EventRecord {
        id: format!("mandate_{}_{:06}", mandate.id, cx.tick),
        timestamp: cx.tick as i64,
        event_type: EventType::Mandate,
        actors,
        location_id: cx.world.base_state.site_tile_id.clone(),
        details: [
            ("result".to_string(), resolution.result.as_str().to_string()),
            ("type".to_string(), mandate.mandate_type.as_str().to_string()),
        ]
        .into(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::runtime::{BaseRuntime, JobOutcome, JobPriority, JobType};
    use crate::core::events::EventBus;
    use crate::core::rng::RngRegistry;
    use crate::testutil::sample_world;
    use crate::world::data::WorldState;
    use std::sync::{Arc, Mutex};

    fn run_ticks(
        world: &mut WorldState,
        runtime: &mut BaseRuntime,
        bus: &EventBus,
        ticks: std::ops::RangeInclusive<u64>,
    ) {
        let rng = RngRegistry::new(world.seed);
        for tick in ticks {
            let mut cx = BaseCx {
                world: &mut *world,
                runtime: &mut *runtime,
                tick,
                bus,
                rng: &rng,
            };
            MandateResolutionSystem.run(&mut cx).unwrap();
        }
    }

    fn maintenance_outcome() -> JobOutcome {
        JobOutcome {
            id: "job_m".to_string(),
            job_type: JobType::Maintenance,
            zone_id: None,
            priority: JobPriority::Normal,
            duration_hours: 6,
        }
    }

    #[test]
    fn test_completed_mandate_rewards_and_chains_follow_up() {
        let mut world = sample_world();
        world.oracle_state.available_decks.clear();
        let mut runtime = BaseRuntime::new(&world.base_state, 4).unwrap();
        runtime.seed_initial_mandates(&world, &world.base_state);
        runtime.record_completed_jobs(vec![maintenance_outcome(), maintenance_outcome()]);

        let bus = EventBus::new();
        let resolved = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&resolved);
        let _sub = bus.subscribe::<MandateResolved, _>(move |e| {
            sink.lock()
                .unwrap()
                .push(format!("{}:{}:{}", e.result.as_str(), e.mandate.id, e.tick));
        });

        // Day boundary at tick 4: two maintenance completions satisfy the
        // two required by mandate_secure_water.
        run_ticks(&mut world, &mut runtime, &bus, 1..=4);

        assert_eq!(
            *resolved.lock().unwrap(),
            vec!["Completed:mandate_secure_water:4"]
        );
        assert!(world.base_state.infrastructure["water"] > 0.0);
        assert!(world
            .events
            .iter()
            .any(|e| e.id == "mandate_mandate_secure_water_000004"));

        let follow_up = runtime
            .mandate_tracker
            .mandates()
            .iter()
            .find(|m| m.id.starts_with("mandate_followup_"))
            .expect("completion should chain a follow-up");
        assert!(follow_up.days_remaining >= 7);
    }

    #[test]
    fn test_failed_mandate_applies_penalty_without_follow_up() {
        let mut world = sample_world();
        world.oracle_state.available_decks.clear();
        world
            .base_state
            .infrastructure
            .insert("morale".into(), 0.5);
        let mut runtime = BaseRuntime::new(&world.base_state, 2).unwrap();
        runtime.seed_initial_mandates(&world, &world.base_state);
        runtime.record_completed_jobs(Vec::new());

        let bus = EventBus::new();
        // mandate_secure_water has 4 days; five day boundaries push it over.
        run_ticks(&mut world, &mut runtime, &bus, 1..=10);

        let mandate = &runtime.mandate_tracker.mandates()[0];
        assert_eq!(mandate.status, MandateStatus::Failed);
        assert!(world.base_state.infrastructure["morale"] < 0.5);
        assert!(!runtime
            .mandate_tracker
            .mandates()
            .iter()
            .any(|m| m.id.starts_with("mandate_followup_")));
    }

    #[test]
    fn test_defense_completion_raises_alert() {
        let mut world = sample_world();
        world.oracle_state.available_decks.clear();
        let mut runtime = BaseRuntime::new(&world.base_state, 1).unwrap();
        runtime.record_completed_jobs(vec![JobOutcome {
            id: "job_w".to_string(),
            job_type: JobType::Patrol,
            zone_id: None,
            priority: JobPriority::High,
            duration_hours: 8,
        }]);

        // Hand-rolled defense mandate requiring a single patrol.
        let source = crate::base::runtime::Mandate {
            id: "mandate_harden".to_string(),
            issuer_character_id: "char_leader".to_string(),
            mandate_type: MandateType::Defense,
            status: MandateStatus::Active,
            target_job_type: JobType::Patrol,
            required_completions: 0,
            completed_count: 0,
            days_remaining: 3,
        };
        runtime.mandate_tracker.enqueue_follow_up(&source, 0);

        let bus = EventBus::new();
        run_ticks(&mut world, &mut runtime, &bus, 1..=1);

        assert_eq!(world.base_state.alert_level, AlertLevel::Elevated);
        assert!(world.base_state.infrastructure["defense"] > 0.4);
    }
}
