//! Shared fixtures for unit tests

use std::collections::BTreeMap;

use crate::world::data::*;

/// A small, internally consistent world: one tile, one faction, one
/// settlement, one leader who is also the base population, an active base
/// with a habitat zone, and a one-card oracle deck (on cooldown).
pub(crate) fn sample_world() -> WorldState {
    let mut faction = Faction {
        id: "fac_alpha".into(),
        name: "Alpha".into(),
        archetype: FactionArchetype::Nomads,
        ..Faction::default()
    };

    faction.noble_roster.push(NobleRoleAssignment {
        character_id: "char_leader".into(),
        role: NobleRole::Overseer,
    });
    faction.holdings.push("set_01".into());
    faction.relations.push(RelationRecord {
        target_faction_id: "fac_alpha".into(),
        standing: 1.0,
        state: RelationState::Allied,
    });

    let mut skills = BTreeMap::new();
    skills.insert(
        SkillId::Leadership,
        SkillLevel {
            level: 3,
            experience: 10.0,
            aptitude: 1.1,
        },
    );

    WorldState {
        seed: 42,
        tiles: vec![Tile {
            id: "tile_0_0".into(),
            position: Int2::new(0, 0),
            biome_id: "biome_desert".into(),
            hazard_tags: vec!["dust".into()],
            ..Tile::default()
        }],
        factions: vec![faction],
        settlements: vec![Settlement {
            id: "set_01".into(),
            faction_id: "fac_alpha".into(),
            tile_id: "tile_0_0".into(),
            population: 100,
            economy: EconomyProfile {
                production: 1.0,
                trade: 1.0,
                research: 0.2,
            },
            ..Settlement::default()
        }],
        characters: vec![Character {
            id: "char_leader".into(),
            name: "Leader".into(),
            faction_id: "fac_alpha".into(),
            traits: vec![TraitId::Stoic],
            skills,
            current_role: Some(NobleRole::Overseer),
            ..Character::default()
        }],
        events: vec![EventRecord {
            id: "event_01".into(),
            timestamp: 1,
            event_type: EventType::Discovery,
            actors: vec!["char_leader".into()],
            location_id: "tile_0_0".into(),
            details: [("resource".to_string(), "water".to_string())].into(),
        }],
        oracle_state: OracleState {
            active_deck_id: "deck_minor_01".into(),
            tension_score: 0.5,
            cooldowns: [("card_rise_nemesis".to_string(), 10_i64)].into(),
            available_decks: vec![EventDeck {
                id: "deck_minor_01".into(),
                tier: OracleDeckTier::Minor,
                weight: 1.0,
                cards: vec![EventCard {
                    id: "card_rise_nemesis".into(),
                    narrative: "Nemesis stirs".into(),
                    effects: vec![EventEffect {
                        effect_type: "spawn_event".into(),
                        parameters: [("target".to_string(), "set_01".to_string())].into(),
                    }],
                    ..EventCard::default()
                }],
            }],
        },
        legends: vec![LegendEntry {
            id: "legend_01".into(),
            summary: "Found water".into(),
            event_ids: vec!["event_01".into()],
        }],
        apocalypse: ApocalypseMeta {
            r#type: ApocalypseType::RadiantStorm,
            severity: 0.7,
            origin_tile_id: "tile_0_0".into(),
            era_timeline: vec![EraEvent {
                timestamp: 0,
                description: "Storm begins".into(),
            }],
        },
        base_state: BaseState {
            active: true,
            site_tile_id: "tile_0_0".into(),
            zones: vec![BaseZone {
                id: "zone_hab".into(),
                name: "Hab".into(),
                r#type: ZoneType::Habitat,
                efficiency: 1.0,
            }],
            population: vec!["char_leader".into()],
            infrastructure: [("power".to_string(), 1.0_f32)].into(),
            inventory: vec![ItemStack {
                item_id: "water".into(),
                quantity: 10,
            }],
            alert_level: AlertLevel::Calm,
            research: ResearchState {
                completed_projects: vec!["tech_filters".into()],
                active_project_id: Some("tech_drills".into()),
                active_progress: 0.5,
            },
        },
        ..WorldState::default()
    }
}
