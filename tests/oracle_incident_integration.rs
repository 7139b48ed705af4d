//! Integration tests for the oracle incident pipeline
//!
//! These tests verify the full producer/consumer loop: a raid resolution
//! nudges tension, draws a cooldown-free card, and the incident system
//! applies its effects to the world in the same tick.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use cinderhold::base::bootstrap::default_systems;
use cinderhold::base::runtime::BaseRuntime;
use cinderhold::base::{BaseSimulation, OracleIncidentInjected};
use cinderhold::core::clock::SimClock;
use cinderhold::core::events::EventBus;
use cinderhold::core::rng::RngRegistry;
use cinderhold::sim::scheduler::TickScheduler;
use cinderhold::world::data::*;

fn world_with_ready_card() -> WorldState {
    WorldState {
        seed: 77,
        tiles: vec![Tile {
            id: "tile_0_0".into(),
            ..Tile::default()
        }],
        factions: vec![Faction {
            id: "fac_raiders".into(),
            name: "Raiders".into(),
            ..Faction::default()
        }],
        oracle_state: OracleState {
            active_deck_id: "deck_minor_01".into(),
            tension_score: 0.9,
            cooldowns: [("card_rise_nemesis".to_string(), 0_i64)].into(),
            available_decks: vec![EventDeck {
                id: "deck_minor_01".into(),
                tier: OracleDeckTier::Minor,
                weight: 1.0,
                cards: vec![EventCard {
                    id: "card_rise_nemesis".into(),
                    narrative: "Nemesis stirs".into(),
                    effects: vec![
                        EventEffect {
                            effect_type: "adjust_tension".into(),
                            parameters: [("delta".to_string(), "0.05".to_string())].into(),
                        },
                        EventEffect {
                            effect_type: "add_inventory".into(),
                            parameters: [
                                ("item".to_string(), "supply_scrap".to_string()),
                                ("quantity".to_string(), "2".to_string()),
                            ]
                            .into(),
                        },
                    ],
                    ..EventCard::default()
                }],
            }],
        },
        base_state: BaseState {
            active: true,
            site_tile_id: "tile_0_0".into(),
            zones: Vec::new(),
            population: Vec::new(),
            infrastructure: BTreeMap::new(),
            alert_level: AlertLevel::Elevated,
            inventory: Vec::new(),
            research: ResearchState::default(),
        },
        ..WorldState::default()
    }
}

#[test]
fn test_raid_resolution_injects_exactly_one_incident() {
    let mut world = world_with_ready_card();
    let bus = Arc::new(EventBus::new());
    let rng = Arc::new(RngRegistry::new(world.seed));

    let incidents = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&incidents);
    let _sub = bus.subscribe::<OracleIncidentInjected, _>(move |e| {
        sink.lock().unwrap().push((e.card_id.clone(), e.trigger.clone()));
    });

    // Force a raid to land on the next tick.
    let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
    runtime.raid_threat.raid_scheduled = true;
    runtime.raid_threat.hours_until_raid = 1;
    runtime.raid_threat.attacking_faction_id = "fac_raiders".into();

    let systems = default_systems(&bus, &world);
    let simulation = BaseSimulation::new(runtime, systems).unwrap();

    let mut scheduler =
        TickScheduler::new(SimClock::new(1, 24).unwrap(), rng, Arc::clone(&bus));
    scheduler.register_system(Box::new(simulation));

    let tension_before = world.oracle_state.tension_score;
    scheduler.advance(&mut world, 1).unwrap();

    // Exactly one incident, triggered by the raid.
    let injected = incidents.lock().unwrap();
    assert_eq!(injected.len(), 1);
    assert_eq!(injected[0], ("card_rise_nemesis".to_string(), "raid".to_string()));

    // The drawn card keeps its full cooldown through the same tick.
    assert_eq!(world.oracle_state.cooldowns["card_rise_nemesis"], 6);

    // Raid tension bump plus the card's own adjustment both landed.
    assert_ne!(world.oracle_state.tension_score, tension_before);

    // The incident's effects were applied and recorded as a world event.
    assert!(world
        .base_state
        .inventory
        .iter()
        .any(|s| s.item_id == "supply_scrap" && s.quantity == 2));
    let incident_events: Vec<_> = world
        .events
        .iter()
        .filter(|e| e.id.starts_with("incident_card_rise_nemesis"))
        .collect();
    assert_eq!(incident_events.len(), 1);
    assert_eq!(incident_events[0].details["trigger"], "raid");
    assert_eq!(incident_events[0].details["attacker"], "fac_raiders");
}

#[test]
fn test_card_on_cooldown_blocks_injection() {
    let mut world = world_with_ready_card();
    world
        .oracle_state
        .cooldowns
        .insert("card_rise_nemesis".to_string(), 10);

    let bus = Arc::new(EventBus::new());
    let rng = Arc::new(RngRegistry::new(world.seed));

    let injected = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&injected);
    let _sub = bus.subscribe::<OracleIncidentInjected, _>(move |_| {
        *sink.lock().unwrap() += 1;
    });

    let mut runtime = BaseRuntime::new(&world.base_state, 24).unwrap();
    runtime.raid_threat.raid_scheduled = true;
    runtime.raid_threat.hours_until_raid = 1;

    let simulation = BaseSimulation::new(runtime, default_systems(&bus, &world)).unwrap();
    let mut scheduler =
        TickScheduler::new(SimClock::new(1, 24).unwrap(), rng, Arc::clone(&bus));
    scheduler.register_system(Box::new(simulation));

    scheduler.advance(&mut world, 1).unwrap();

    assert_eq!(*injected.lock().unwrap(), 0);
    // The raid still raised tension even though no card was drawn.
    assert!(world.oracle_state.tension_score > 0.9);
    // The unused cooldown stepped down by one.
    assert_eq!(world.oracle_state.cooldowns["card_rise_nemesis"], 9);
}
