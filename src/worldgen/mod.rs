//! Deterministic overworld generation
//!
//! Builds an initial world snapshot from `{seed, width, height, apocalypse}`
//! using only registry channels, so the same configuration always produces
//! the same world. Tile noise is sampled by reseeding a channel with an
//! offset derived from (seed, x, y, salt) rather than by stream position,
//! which keeps every tile's values independent of generation order.

use crate::core::error::{SimError, SimResult};
use crate::core::rng::{combine_seed, fnv1a, RngChannel, RngRegistry};
use crate::world::data::*;
use crate::world::normalize::normalize;

const HEIGHTMAP_CHANNEL: &str = "worldgen.heightmap";
const CLIMATE_CHANNEL: &str = "worldgen.climate";
const BIOME_CHANNEL: &str = "worldgen.biomes";
const HAZARD_CHANNEL: &str = "worldgen.hazards";
const RESOURCE_CHANNEL: &str = "worldgen.resources";
const FACTION_CHANNEL: &str = "worldgen.factions";

const DEFAULT_FACTION_COUNT: usize = 3;

/// Configuration for one generation run.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    pub apocalypse: ApocalypseType,
}

/// Generator over a channel registry.
pub struct OverworldGenerator<'a> {
    rng: &'a RngRegistry,
}

impl<'a> OverworldGenerator<'a> {
    pub fn new(rng: &'a RngRegistry) -> Self {
        Self { rng }
    }

    /// Generate a complete, normalized initial world.
    pub fn generate(&self, config: &GenerationConfig) -> SimResult<WorldState> {
        if config.width == 0 || config.height == 0 {
            return Err(SimError::InvalidArgument(
                "world dimensions must be positive".to_string(),
            ));
        }

        let mut world = WorldState {
            seed: config.seed,
            apocalypse: ApocalypseMeta {
                r#type: config.apocalypse,
                severity: 0.5,
                ..ApocalypseMeta::default()
            },
            ..WorldState::default()
        };

        world.tiles = self.generate_tiles(config)?;
        populate_apocalypse_metadata(&mut world, config);

        world.factions = self.seed_factions(&world.tiles, config)?;
        world.settlements = create_settlements(&world.tiles, &world.factions);
        world.characters = create_leaders(&world.factions);
        hook_up_faction_references(
            &mut world.factions,
            &world.settlements,
            &world.characters,
        );

        world.events = create_initial_events(&world);
        world.legends = create_initial_legends(&world.events);
        world.oracle_state = create_oracle_state();
        world.base_state = create_base_state(&world);

        normalize(&mut world);
        Ok(world)
    }

    fn generate_tiles(&self, config: &GenerationConfig) -> SimResult<Vec<Tile>> {
        let height_rng = self.rng.channel(HEIGHTMAP_CHANNEL)?;
        let climate_rng = self.rng.channel(CLIMATE_CHANNEL)?;
        let biome_rng = self.rng.channel(BIOME_CHANNEL)?;
        let hazard_rng = self.rng.channel(HAZARD_CHANNEL)?;
        let resource_rng = self.rng.channel(RESOURCE_CHANNEL)?;

        let seed = config.seed;
        let mut tiles = Vec::with_capacity((config.width * config.height) as usize);

        for y in 0..config.height as i64 {
            for x in 0..config.width as i64 {
                let height = sample_signed(&height_rng, seed, x, y, 11);
                let latitude = y as f32 / (config.height.max(2) - 1) as f32;
                // Equator runs through the middle of the map.
                let temperature_base = 1.0 - (latitude - 0.5).abs() * 2.0;
                let temperature_noise = sample(&height_rng, seed, x, y, 29) as f32 * 0.35;
                let temperature = (temperature_base + temperature_noise).clamp(0.0, 1.0);

                let moisture = (sample(&climate_rng, seed, x, y, 7) as f32).clamp(0.0, 1.0);
                let biome =
                    select_biome(height, temperature, moisture, &biome_rng, seed, x, y);
                let mut hazard_tags = determine_hazards(
                    config.apocalypse,
                    &hazard_rng,
                    seed,
                    x,
                    y,
                    temperature,
                    &biome,
                );
                hazard_tags.extend(determine_resources(&resource_rng, seed, x, y, &biome));

                tiles.push(Tile {
                    id: format!("tile_{}_{}", x, y),
                    position: Int2::new(x as i32, y as i32),
                    height,
                    temperature,
                    moisture,
                    biome_id: biome,
                    hazard_tags,
                });
            }
        }

        Ok(tiles)
    }

    fn seed_factions(
        &self,
        tiles: &[Tile],
        config: &GenerationConfig,
    ) -> SimResult<Vec<Faction>> {
        let mut viable: Vec<&Tile> = tiles
            .iter()
            .filter(|tile| {
                tile.hazard_tags
                    .iter()
                    .all(|tag| !tag.starts_with("haz_") || tag == "haz_sporefall")
            })
            .collect();
        viable.sort_by(|a, b| {
            distance_to_center(a.position, config)
                .total_cmp(&distance_to_center(b.position, config))
                .then_with(|| a.id.cmp(&b.id))
        });
        viable.truncate(DEFAULT_FACTION_COUNT);

        let channel = self.rng.channel(FACTION_CHANNEL)?;
        let archetypes = [
            FactionArchetype::Nomads,
            FactionArchetype::Technocracy,
            FactionArchetype::Zealots,
            FactionArchetype::Mercantile,
            FactionArchetype::Raiders,
            FactionArchetype::Guardians,
        ];

        let mut factions = Vec::new();
        for (index, tile) in viable.iter().enumerate() {
            let x = tile.position.x as i64;
            let y = tile.position.y as i64;
            channel.reseed(derive_offset(config.seed, x, y, 97));
            let archetype = archetypes[channel.next_int(0, archetypes.len() as i64)? as usize];

            factions.push(Faction {
                id: format!("fac_{:02}", index),
                name: generate_faction_name(&channel, config.seed, tile.position)?,
                archetype,
                ethos_profile: EthosProfile {
                    compassion: sample(&channel, config.seed, x, y, 101) as f32,
                    ruthlessness: sample(&channel, config.seed, x, y, 103) as f32,
                    tradition: sample(&channel, config.seed, x, y, 107) as f32,
                    innovation: sample(&channel, config.seed, x, y, 109) as f32,
                },
                ..Faction::default()
            });
        }

        let ids: Vec<String> = factions.iter().map(|f| f.id.clone()).collect();
        for faction in &mut factions {
            for other_id in &ids {
                if other_id == &faction.id {
                    continue;
                }
                let standing = 0.25
                    + 0.5 * sample(
                        &channel,
                        config.seed,
                        fnv1a(faction.id.as_bytes()) as i64,
                        fnv1a(other_id.as_bytes()) as i64,
                        113,
                    ) as f32;
                faction.relations.push(RelationRecord {
                    target_faction_id: other_id.clone(),
                    standing,
                    state: if standing > 0.6 {
                        RelationState::Allied
                    } else if standing < 0.35 {
                        RelationState::Hostile
                    } else {
                        RelationState::Neutral
                    },
                });
            }
        }

        Ok(factions)
    }
}

fn derive_offset(seed: u64, x: i64, y: i64, salt: i64) -> i64 {
    combine_seed(&[
        seed & 0xFFFF_FFFF,
        seed >> 32,
        x as u64,
        y as u64,
        salt as u64,
    ]) as i64
}

/// Reseed by position and draw once: values depend only on (seed, x, y,
/// salt), never on how many tiles were generated before this one.
fn sample(channel: &RngChannel, seed: u64, x: i64, y: i64, salt: i64) -> f64 {
    channel.reseed(derive_offset(seed, x, y, salt));
    channel.next_float01()
}

fn sample_signed(channel: &RngChannel, seed: u64, x: i64, y: i64, salt: i64) -> f32 {
    (sample(channel, seed, x, y, salt) * 2.0 - 1.0) as f32
}

fn select_biome(
    height: f32,
    temperature: f32,
    moisture: f32,
    channel: &RngChannel,
    seed: u64,
    x: i64,
    y: i64,
) -> String {
    if height < -0.1 {
        return "biome_sunken_basin".to_string();
    }
    if height > 0.6 {
        return if temperature > 0.5 {
            "biome_crimson_mesa".to_string()
        } else {
            "biome_frozen_peak".to_string()
        };
    }
    if moisture < 0.25 {
        return if temperature > 0.6 {
            "biome_glass_desert".to_string()
        } else {
            "biome_shattered_steppe".to_string()
        };
    }
    if moisture > 0.75 {
        return if temperature > 0.5 {
            "biome_fungal_forest".to_string()
        } else {
            "biome_rust_mire".to_string()
        };
    }

    if sample(channel, seed, x, y, 53) > 0.5 {
        "biome_ashen_plains".to_string()
    } else {
        "biome_marrow_fields".to_string()
    }
}

fn determine_hazards(
    apocalypse: ApocalypseType,
    channel: &RngChannel,
    seed: u64,
    x: i64,
    y: i64,
    temperature: f32,
    biome: &str,
) -> Vec<String> {
    let mut hazards = Vec::new();

    if sample(channel, seed, x, y, 71) > 0.7 {
        hazards.push(
            match apocalypse {
                ApocalypseType::RadiantStorm => "haz_radiant_flux",
                ApocalypseType::NanoPlague => "haz_nanite_bloom",
                ApocalypseType::ArcaneSundering => "haz_void_rupture",
                ApocalypseType::VoidBlight => "haz_hollow_winds",
            }
            .to_string(),
        );
    }

    if temperature > 0.8 && !hazards.iter().any(|h| h == "haz_radiant_flux") {
        hazards.push("haz_solar_scorch".to_string());
    }

    if biome == "biome_fungal_forest" {
        hazards.push("haz_sporefall".to_string());
    }

    hazards
}

fn determine_resources(
    channel: &RngChannel,
    seed: u64,
    x: i64,
    y: i64,
    biome: &str,
) -> Vec<String> {
    let roll = sample(channel, seed, x, y, 83);
    if roll > 0.85 {
        vec!["res_relic_cache".to_string()]
    } else if roll > 0.55 {
        vec![match biome {
            "biome_glass_desert" => "res_silica_vein",
            "biome_fungal_forest" => "res_myco_spores",
            "biome_crimson_mesa" => "res_iron_spine",
            _ => "res_salvage_field",
        }
        .to_string()]
    } else {
        Vec::new()
    }
}

fn distance_to_center(position: Int2, config: &GenerationConfig) -> f64 {
    let center_x = (config.width - 1) as f64 / 2.0;
    let center_y = (config.height - 1) as f64 / 2.0;
    let dx = position.x as f64 - center_x;
    let dy = position.y as f64 - center_y;
    (dx * dx + dy * dy).sqrt()
}

fn populate_apocalypse_metadata(world: &mut WorldState, config: &GenerationConfig) {
    let origin = world
        .tiles
        .iter()
        .min_by(|a, b| {
            distance_to_center(a.position, config)
                .total_cmp(&distance_to_center(b.position, config))
                .then_with(|| a.id.cmp(&b.id))
        })
        .map(|tile| tile.id.clone())
        .unwrap_or_default();

    world.apocalypse.origin_tile_id = origin;
    world.apocalypse.era_timeline = vec![
        EraEvent {
            timestamp: 0,
            description: "Pre-Fall prosperity".to_string(),
        },
        EraEvent {
            timestamp: 1,
            description: "Cataclysm reshapes the wastes".to_string(),
        },
        EraEvent {
            timestamp: 2,
            description: "Factions fracture into splinters".to_string(),
        },
        EraEvent {
            timestamp: 3,
            description: "Present day conflicts ignite".to_string(),
        },
    ];
}

fn generate_faction_name(
    channel: &RngChannel,
    seed: u64,
    position: Int2,
) -> SimResult<String> {
    const PREFIXES: [&str; 5] = ["Dust", "Iron", "Solar", "Echo", "Shard"];
    const SUFFIXES: [&str; 5] = ["Walkers", "Legion", "Covenant", "Collective", "Syndicate"];

    channel.reseed(derive_offset(seed, position.x as i64, position.y as i64, 131));
    let prefix = PREFIXES[channel.next_int(0, PREFIXES.len() as i64)? as usize];
    let suffix = SUFFIXES[channel.next_int(0, SUFFIXES.len() as i64)? as usize];
    Ok(format!("{} {}", prefix, suffix))
}

fn create_settlements(tiles: &[Tile], factions: &[Faction]) -> Vec<Settlement> {
    tiles
        .iter()
        .zip(factions.iter())
        .map(|(tile, faction)| Settlement {
            id: format!("set_{}_{}", tile.position.x, tile.position.y),
            faction_id: faction.id.clone(),
            tile_id: tile.id.clone(),
            population: 150 + tile.position.x as u32 * 5 + tile.position.y as u32 * 3,
            economy: EconomyProfile {
                production: (tile.height + 1.0).clamp(0.0, 2.0),
                trade: (tile.moisture + 0.5).clamp(0.0, 2.0),
                research: (tile.temperature + 0.3).clamp(0.0, 2.0),
            },
            defense_rating: 0.4 + tile.height * 0.3,
        })
        .collect()
}

fn create_leaders(factions: &[Faction]) -> Vec<Character> {
    factions
        .iter()
        .map(|faction| {
            let mut skills = std::collections::BTreeMap::new();
            skills.insert(
                SkillId::Leadership,
                SkillLevel {
                    level: 4,
                    experience: 25.0,
                    aptitude: 1.2,
                },
            );
            skills.insert(
                SkillId::Tactics,
                SkillLevel {
                    level: 3,
                    experience: 18.0,
                    aptitude: 1.05,
                },
            );

            Character {
                id: format!("char_{}", faction.id),
                name: format!("{} Primus", faction.name),
                faction_id: faction.id.clone(),
                traits: vec![TraitId::Visionary],
                skills,
                current_role: Some(NobleRole::Overseer),
                status: CharacterStatus::Active,
                ..Character::default()
            }
        })
        .collect()
}

fn hook_up_faction_references(
    factions: &mut [Faction],
    settlements: &[Settlement],
    characters: &[Character],
) {
    for faction in factions.iter_mut() {
        if let Some(leader) = characters.iter().find(|c| c.faction_id == faction.id) {
            faction.noble_roster.push(NobleRoleAssignment {
                character_id: leader.id.clone(),
                role: NobleRole::Overseer,
            });
        }
        for settlement in settlements.iter().filter(|s| s.faction_id == faction.id) {
            faction.holdings.push(settlement.id.clone());
        }
    }
}

fn create_initial_events(world: &WorldState) -> Vec<EventRecord> {
    vec![EventRecord {
        id: "event_foundation".to_string(),
        timestamp: 0,
        event_type: EventType::Discovery,
        actors: world.characters.iter().map(|c| c.id.clone()).collect(),
        location_id: world
            .settlements
            .first()
            .map(|s| s.id.clone())
            .unwrap_or_default(),
        details: [(
            "message".to_string(),
            "Settlements established after the Cataclysm".to_string(),
        )]
        .into(),
    }]
}

fn create_initial_legends(events: &[EventRecord]) -> Vec<LegendEntry> {
    vec![LegendEntry {
        id: "legend_reclamation".to_string(),
        summary: "The surviving houses carve footholds into the wastes.".to_string(),
        event_ids: events.iter().map(|e| e.id.clone()).collect(),
    }]
}

fn create_oracle_state() -> OracleState {
    let effect = |effect_type: &str, params: &[(&str, &str)]| EventEffect {
        effect_type: effect_type.to_string(),
        parameters: params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    };

    OracleState {
        active_deck_id: "deck_minor_intro".to_string(),
        tension_score: 0.35,
        cooldowns: Default::default(),
        available_decks: vec![EventDeck {
            id: "deck_minor_intro".to_string(),
            tier: OracleDeckTier::Minor,
            weight: 1.0,
            cards: vec![
                EventCard {
                    id: "card_supply_cache".to_string(),
                    narrative: "A cache of pre-fall supplies appears in the wastes.".to_string(),
                    effects: vec![effect(
                        "add_inventory",
                        &[("item", "supply_cache"), ("quantity", "3")],
                    )],
                    ..EventCard::default()
                },
                EventCard {
                    id: "card_dust_omens".to_string(),
                    narrative: "Dust storms carry whispers of worse to come.".to_string(),
                    effects: vec![
                        effect("adjust_tension", &[("delta", "0.05")]),
                        effect("adjust_infrastructure", &[("stat", "morale"), ("delta", "-0.05")]),
                    ],
                    ..EventCard::default()
                },
                EventCard {
                    id: "card_raider_probe".to_string(),
                    narrative: "Raider scouts test the perimeter defenses.".to_string(),
                    effects: vec![
                        effect("adjust_infrastructure", &[("stat", "defense"), ("delta", "-0.05")]),
                        effect(
                            "schedule_job",
                            &[
                                ("job", "job_perimeter_sweep"),
                                ("type", "patrol"),
                                ("priority", "high"),
                                ("duration", "4"),
                            ],
                        ),
                    ],
                    ..EventCard::default()
                },
            ],
        }],
    }
}

fn create_base_state(world: &WorldState) -> BaseState {
    let site_tile_id = world
        .settlements
        .first()
        .map(|s| s.tile_id.clone())
        .or_else(|| world.tiles.first().map(|t| t.id.clone()))
        .unwrap_or_default();

    BaseState {
        active: false,
        site_tile_id,
        zones: vec![BaseZone {
            id: "zone_command".to_string(),
            name: "Command Nexus".to_string(),
            r#type: ZoneType::Watchtower,
            efficiency: 0.85,
        }],
        population: world
            .characters
            .first()
            .map(|leader| vec![leader.id.clone()])
            .unwrap_or_default(),
        infrastructure: [
            ("power".to_string(), 0.75_f32),
            ("water".to_string(), 0.65_f32),
        ]
        .into(),
        inventory: vec![ItemStack {
            item_id: "supply_basic".to_string(),
            quantity: 25,
        }],
        alert_level: AlertLevel::Calm,
        research: ResearchState::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::validate::WorldValidator;

    fn config() -> GenerationConfig {
        GenerationConfig {
            seed: 1337,
            width: 8,
            height: 6,
            apocalypse: ApocalypseType::RadiantStorm,
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let rng_a = RngRegistry::new(1337);
        let rng_b = RngRegistry::new(1337);
        let world_a = OverworldGenerator::new(&rng_a).generate(&config()).unwrap();
        let world_b = OverworldGenerator::new(&rng_b).generate(&config()).unwrap();
        assert_eq!(world_a, world_b);
    }

    #[test]
    fn test_generation_covers_grid() {
        let rng = RngRegistry::new(7);
        let world = OverworldGenerator::new(&rng).generate(&config()).unwrap();
        assert_eq!(world.tiles.len(), 48);
        assert!(world.tiles.iter().any(|t| t.id == "tile_0_0"));
        assert!(world.tiles.iter().any(|t| t.id == "tile_7_5"));
    }

    #[test]
    fn test_generated_world_passes_validation() {
        let rng = RngRegistry::new(99);
        let mut world = OverworldGenerator::new(&rng).generate(&config()).unwrap();
        let report = WorldValidator::validate(&mut world);
        assert!(report.is_valid(), "errors: {:?}", report.errors());
    }

    #[test]
    fn test_factions_get_leaders_and_relations() {
        let rng = RngRegistry::new(5);
        let world = OverworldGenerator::new(&rng).generate(&config()).unwrap();

        assert!(!world.factions.is_empty());
        for faction in &world.factions {
            assert!(!faction.noble_roster.is_empty(), "faction without leader");
            assert_eq!(faction.relations.len(), world.factions.len() - 1);
        }
        assert_eq!(world.characters.len(), world.factions.len());
    }

    #[test]
    fn test_starter_base_is_inactive_with_command_zone() {
        let rng = RngRegistry::new(5);
        let world = OverworldGenerator::new(&rng).generate(&config()).unwrap();

        let base = &world.base_state;
        assert!(!base.active);
        assert_eq!(base.zones.len(), 1);
        assert_eq!(base.zones[0].r#type, ZoneType::Watchtower);
        assert_eq!(base.population.len(), 1);
        assert!(!base.site_tile_id.is_empty());
    }

    #[test]
    fn test_starter_deck_uses_known_effect_kinds() {
        let known = [
            "adjust_infrastructure",
            "adjust_tension",
            "add_inventory",
            "adjust_zone_morale",
            "schedule_job",
            "set_alert_level",
            "spawn_event",
        ];
        let rng = RngRegistry::new(5);
        let world = OverworldGenerator::new(&rng).generate(&config()).unwrap();

        for deck in &world.oracle_state.available_decks {
            for card in &deck.cards {
                for effect in &card.effects {
                    assert!(
                        known.contains(&effect.effect_type.as_str()),
                        "card {} carries unknown effect kind {}",
                        card.id,
                        effect.effect_type
                    );
                }
            }
        }
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let rng = RngRegistry::new(5);
        let mut bad = config();
        bad.width = 0;
        assert!(OverworldGenerator::new(&rng).generate(&bad).is_err());
    }
}
