//! Raid threat system
//!
//! Third system each tick. The threat meter accumulates pressure from
//! entropy, oracle tension and weak defenses, and is pushed back down by
//! patrols and watchtowers. Crossing the high-water mark schedules a raid;
//! the countdown then resolves into a Raid world event, a Critical alert
//! and an oracle notification.

use crate::base::runtime::JobType;
use crate::base::{oracle, BaseCx, BaseSystem, RaidResolved, RaidScheduled};
use crate::core::error::SimResult;
use crate::world::data::{AlertLevel, EventRecord, EventType};

pub struct RaidThreatSystem;

impl BaseSystem for RaidThreatSystem {
    fn name(&self) -> &'static str {
        "raids"
    }

    fn run(&mut self, cx: &mut BaseCx<'_>) -> SimResult<()> {
        let channel = cx.channel("raids.threat")?;
        let tension_modifier = (cx.world.oracle_state.tension_score - 0.5) * 0.08;
        let defense_modifier = match cx.world.base_state.infrastructure.get("defense") {
            Some(defense) => (0.6 - defense) * 0.05,
            None => 0.02,
        };
        let patrols_completed = cx
            .runtime
            .recently_completed_jobs
            .iter()
            .filter(|job| job.job_type == JobType::Patrol)
            .count() as f32;

        let mut delta = (channel.next_float01() * 0.06 - 0.02) as f32;
        delta += tension_modifier + defense_modifier;
        delta -= patrols_completed * 0.04;

        let threat = (cx.runtime.raid_threat.threat_meter + delta).clamp(0.0, 1.0);
        cx.runtime.raid_threat.threat_meter = threat;

        if cx.runtime.raid_threat.raid_scheduled {
            cx.runtime.raid_threat.hours_until_raid -= 1;
            if cx.runtime.raid_threat.hours_until_raid <= 0 {
                resolve_raid(cx)?;
            }
            return Ok(());
        }

        if threat > 0.85 {
            let attacker = cx
                .world
                .factions
                .first()
                .map(|f| f.id.clone())
                .unwrap_or_default();
            // Countdown scales with day length, floored at four hours.
            let hours_until_raid = (cx.runtime.hours_per_day() as i64 / 3).max(4);

            let raid = &mut cx.runtime.raid_threat;
            raid.raid_scheduled = true;
            raid.hours_until_raid = hours_until_raid;
            raid.attacking_faction_id = attacker.clone();
            cx.world.base_state.alert_level = AlertLevel::Elevated;
            tracing::info!(attacker = %attacker, hours = hours_until_raid, "raid scheduled");
            cx.bus.publish(RaidScheduled {
                attacker_faction_id: attacker,
                hours_until_raid,
            });
        } else if cx.world.base_state.alert_level != AlertLevel::Calm && threat < 0.25 {
            cx.world.base_state.alert_level = AlertLevel::Calm;
        }

        Ok(())
    }
}

fn resolve_raid(cx: &mut BaseCx<'_>) -> SimResult<()> {
    let raid = &mut cx.runtime.raid_threat;
    raid.raid_scheduled = false;
    raid.threat_meter = 0.35;
    let attacker = raid.attacking_faction_id.clone();
    cx.world.base_state.alert_level = AlertLevel::Critical;

    let event_id = format!("base_raid_{:06}", cx.tick);
    let details = [
        ("attacker".to_string(), attacker.clone()),
        (
            "alertLevel".to_string(),
            format!("{:?}", cx.world.base_state.alert_level),
        ),
        ("threat".to_string(), format!("{:.2}", 0.35)),
    ]
    .into();
    cx.world.events.push(EventRecord {
        id: event_id.clone(),
        timestamp: cx.tick as i64,
        event_type: EventType::Raid,
        actors: Vec::new(),
        location_id: cx.world.base_state.site_tile_id.clone(),
        details,
    });

    let defense = cx
        .world
        .base_state
        .infrastructure
        .get("defense")
        .copied()
        .unwrap_or(0.4);
    cx.world
        .base_state
        .infrastructure
        .insert("defense".to_string(), (defense - 0.1).clamp(0.0, 1.2));

    tracing::info!(attacker = %attacker, event = %event_id, "raid resolved");
    oracle::record_raid_outcome(cx, &attacker, &event_id)?;
    cx.bus.publish(RaidResolved {
        event_id,
        attacker_faction_id: attacker,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::runtime::BaseRuntime;
    use crate::core::events::EventBus;
    use crate::core::rng::RngRegistry;
    use crate::testutil::sample_world;
    use crate::world::data::WorldState;
    use std::sync::{Arc, Mutex};

    fn run_system(
        world: &mut WorldState,
        runtime: &mut BaseRuntime,
        bus: &EventBus,
        tick: u64,
    ) {
        let rng = RngRegistry::new(world.seed);
        let mut cx = BaseCx {
            world,
            runtime,
            tick,
            bus,
            rng: &rng,
        };
        RaidThreatSystem.run(&mut cx).unwrap();
    }

    #[test]
    fn test_threat_never_leaves_unit_interval() {
        let mut world = sample_world();
        world.oracle_state.tension_score = 1.0;
        world
            .base_state
            .infrastructure
            .insert("defense".into(), 0.0);
        let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
        let bus = EventBus::new();

        for tick in 1..=200 {
            run_system(&mut world, &mut runtime, &bus, tick);
            let threat = runtime.raid_threat.threat_meter;
            assert!(
                (0.0..=1.0).contains(&threat),
                "threat {} out of range at tick {}",
                threat,
                tick
            );
        }
    }

    #[test]
    fn test_high_threat_schedules_raid() {
        let mut world = sample_world();
        let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
        runtime.raid_threat.threat_meter = 0.95;
        world.oracle_state.tension_score = 1.0;

        let bus = EventBus::new();
        let scheduled = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&scheduled);
        let _sub = bus.subscribe::<RaidScheduled, _>(move |e| {
            sink.lock().unwrap().push(e.hours_until_raid);
        });

        run_system(&mut world, &mut runtime, &bus, 1);

        assert!(runtime.raid_threat.raid_scheduled);
        assert_eq!(runtime.raid_threat.attacking_faction_id, "fac_alpha");
        assert_eq!(world.base_state.alert_level, AlertLevel::Elevated);
        assert_eq!(*scheduled.lock().unwrap(), vec![8]);
    }

    #[test]
    fn test_scheduled_raid_resolves_to_known_state() {
        let mut world = sample_world();
        // Empty the deck list so the oracle draw is a no-op in this test.
        world.oracle_state.available_decks.clear();
        let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
        runtime.raid_threat.raid_scheduled = true;
        runtime.raid_threat.hours_until_raid = 1;
        runtime.raid_threat.attacking_faction_id = "fac_alpha".into();

        let bus = EventBus::new();
        let resolved = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&resolved);
        let _sub = bus.subscribe::<RaidResolved, _>(move |e| {
            sink.lock().unwrap().push(e.event_id.clone());
        });

        run_system(&mut world, &mut runtime, &bus, 7);

        assert!(!runtime.raid_threat.raid_scheduled);
        assert_eq!(runtime.raid_threat.threat_meter, 0.35);
        assert_eq!(world.base_state.alert_level, AlertLevel::Critical);
        assert_eq!(*resolved.lock().unwrap(), vec!["base_raid_000007"]);

        let raid_events: Vec<_> = world
            .events
            .iter()
            .filter(|e| e.event_type == EventType::Raid)
            .collect();
        assert_eq!(raid_events.len(), 1);
        assert_eq!(raid_events[0].details["attacker"], "fac_alpha");
    }

    #[test]
    fn test_raid_resolution_weakens_defense() {
        let mut world = sample_world();
        world.oracle_state.available_decks.clear();
        world
            .base_state
            .infrastructure
            .insert("defense".into(), 0.8);
        let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
        runtime.raid_threat.raid_scheduled = true;
        runtime.raid_threat.hours_until_raid = 1;

        let bus = EventBus::new();
        run_system(&mut world, &mut runtime, &bus, 1);

        assert!((world.base_state.infrastructure["defense"] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_calm_restored_when_threat_subsides() {
        let mut world = sample_world();
        world.base_state.alert_level = AlertLevel::Elevated;
        world.oracle_state.tension_score = 0.0;
        world
            .base_state
            .infrastructure
            .insert("defense".into(), 1.5);
        let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
        runtime.raid_threat.threat_meter = 0.0;

        let bus = EventBus::new();
        run_system(&mut world, &mut runtime, &bus, 1);

        assert_eq!(world.base_state.alert_level, AlertLevel::Calm);
    }
}
