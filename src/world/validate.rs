//! Referential integrity checks for world snapshots
//!
//! The validator reports duplicate ids and dangling references without
//! repairing anything. It normalizes the world first (normalization is
//! idempotent and semantics-preserving) and then walks every cross
//! reference. Runtime systems treat dangling references as no-ops; this
//! pass is how they get surfaced to tooling instead of panicking.

use ahash::AHashSet;

use crate::world::data::WorldState;
use crate::world::normalize::normalize;

/// Outcome of a validation pass.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

/// Read-only referential integrity checker.
pub struct WorldValidator;

impl WorldValidator {
    pub fn validate(world: &mut WorldState) -> ValidationReport {
        normalize(world);

        let mut errors = Vec::new();
        Self::validate_tiles(world, &mut errors);
        Self::validate_factions(world, &mut errors);
        Self::validate_settlements(world, &mut errors);
        Self::validate_characters(world, &mut errors);
        Self::validate_events(world, &mut errors);
        Self::validate_legends(world, &mut errors);
        Self::validate_oracle(world, &mut errors);
        Self::validate_base_state(world, &mut errors);

        ValidationReport { errors }
    }

    fn validate_tiles(world: &WorldState, errors: &mut Vec<String>) {
        ensure_unique(world.tiles.iter().map(|t| t.id.as_str()), "tile", errors);
        for tile in &world.tiles {
            if tile.id.trim().is_empty() {
                errors.push("Tile id must not be empty".to_string());
            }
        }
    }

    fn validate_factions(world: &WorldState, errors: &mut Vec<String>) {
        ensure_unique(
            world.factions.iter().map(|f| f.id.as_str()),
            "faction",
            errors,
        );

        let faction_ids: AHashSet<&str> =
            world.factions.iter().map(|f| f.id.as_str()).collect();
        let settlement_ids: AHashSet<&str> =
            world.settlements.iter().map(|s| s.id.as_str()).collect();

        for faction in &world.factions {
            if faction.id.trim().is_empty() {
                errors.push("Faction id must not be empty".to_string());
            }
            for relation in &faction.relations {
                if !faction_ids.contains(relation.target_faction_id.as_str()) {
                    errors.push(format!(
                        "Faction '{}' relation points to unknown faction '{}'",
                        faction.id, relation.target_faction_id
                    ));
                }
            }
            for assignment in &faction.noble_roster {
                if assignment.character_id.trim().is_empty() {
                    errors.push(format!(
                        "Faction '{}' has a noble role without a character id",
                        faction.id
                    ));
                }
            }
            for holding in &faction.holdings {
                if !settlement_ids.contains(holding.as_str()) {
                    errors.push(format!(
                        "Faction '{}' references unknown settlement '{}'",
                        faction.id, holding
                    ));
                }
            }
        }
    }

    fn validate_settlements(world: &WorldState, errors: &mut Vec<String>) {
        ensure_unique(
            world.settlements.iter().map(|s| s.id.as_str()),
            "settlement",
            errors,
        );

        let faction_ids: AHashSet<&str> =
            world.factions.iter().map(|f| f.id.as_str()).collect();
        let tile_ids: AHashSet<&str> = world.tiles.iter().map(|t| t.id.as_str()).collect();

        for settlement in &world.settlements {
            if !faction_ids.contains(settlement.faction_id.as_str()) {
                errors.push(format!(
                    "Settlement '{}' references unknown faction '{}'",
                    settlement.id, settlement.faction_id
                ));
            }
            if !tile_ids.contains(settlement.tile_id.as_str()) {
                errors.push(format!(
                    "Settlement '{}' references unknown tile '{}'",
                    settlement.id, settlement.tile_id
                ));
            }
        }
    }

    fn validate_characters(world: &WorldState, errors: &mut Vec<String>) {
        ensure_unique(
            world.characters.iter().map(|c| c.id.as_str()),
            "character",
            errors,
        );

        let faction_ids: AHashSet<&str> =
            world.factions.iter().map(|f| f.id.as_str()).collect();
        let character_ids: AHashSet<&str> =
            world.characters.iter().map(|c| c.id.as_str()).collect();

        for character in &world.characters {
            if !faction_ids.contains(character.faction_id.as_str()) {
                errors.push(format!(
                    "Character '{}' references unknown faction '{}'",
                    character.id, character.faction_id
                ));
            }
            for relationship in &character.relationships {
                if !character_ids.contains(relationship.target_id.as_str()) {
                    errors.push(format!(
                        "Character '{}' has relationship to unknown character '{}'",
                        character.id, relationship.target_id
                    ));
                }
            }
        }

        for faction in &world.factions {
            for assignment in &faction.noble_roster {
                if !character_ids.contains(assignment.character_id.as_str()) {
                    errors.push(format!(
                        "Faction '{}' assigns noble role {:?} to unknown character '{}'",
                        faction.id, assignment.role, assignment.character_id
                    ));
                }
            }
        }
    }

    fn validate_events(world: &WorldState, errors: &mut Vec<String>) {
        ensure_unique(world.events.iter().map(|e| e.id.as_str()), "event", errors);

        let character_ids: AHashSet<&str> =
            world.characters.iter().map(|c| c.id.as_str()).collect();
        let tile_ids: AHashSet<&str> = world.tiles.iter().map(|t| t.id.as_str()).collect();
        let settlement_ids: AHashSet<&str> =
            world.settlements.iter().map(|s| s.id.as_str()).collect();

        for event in &world.events {
            for actor in &event.actors {
                if !character_ids.contains(actor.as_str()) {
                    errors.push(format!(
                        "Event '{}' references unknown character '{}'",
                        event.id, actor
                    ));
                }
            }
            if !event.location_id.is_empty() {
                let valid = tile_ids.contains(event.location_id.as_str())
                    || settlement_ids.contains(event.location_id.as_str())
                    || event.location_id == world.base_state.site_tile_id;
                if !valid {
                    errors.push(format!(
                        "Event '{}' references unknown location '{}'",
                        event.id, event.location_id
                    ));
                }
            }
        }
    }

    fn validate_legends(world: &WorldState, errors: &mut Vec<String>) {
        ensure_unique(
            world.legends.iter().map(|l| l.id.as_str()),
            "legend",
            errors,
        );

        let event_ids: AHashSet<&str> = world.events.iter().map(|e| e.id.as_str()).collect();
        for legend in &world.legends {
            for event_id in &legend.event_ids {
                if !event_ids.contains(event_id.as_str()) {
                    errors.push(format!(
                        "Legend '{}' references unknown event '{}'",
                        legend.id, event_id
                    ));
                }
            }
        }
    }

    fn validate_oracle(world: &WorldState, errors: &mut Vec<String>) {
        let mut deck_ids = AHashSet::new();
        for deck in &world.oracle_state.available_decks {
            if !deck_ids.insert(deck.id.as_str()) {
                errors.push(format!("Oracle deck id '{}' is duplicated", deck.id));
            }
            let mut card_ids = AHashSet::new();
            for card in &deck.cards {
                if !card_ids.insert(card.id.as_str()) {
                    errors.push(format!(
                        "Deck '{}' has duplicate card id '{}'",
                        deck.id, card.id
                    ));
                }
            }
        }
    }

    fn validate_base_state(world: &WorldState, errors: &mut Vec<String>) {
        let base = &world.base_state;
        let mut zone_ids = AHashSet::new();
        for zone in &base.zones {
            if !zone_ids.insert(zone.id.as_str()) {
                errors.push(format!("Base zone id '{}' is duplicated", zone.id));
            }
        }

        let character_ids: AHashSet<&str> =
            world.characters.iter().map(|c| c.id.as_str()).collect();
        for member in &base.population {
            if !character_ids.contains(member.as_str()) {
                errors.push(format!(
                    "Base population references unknown character '{}'",
                    member
                ));
            }
        }
    }
}

fn ensure_unique<'a>(
    ids: impl Iterator<Item = &'a str>,
    label: &str,
    errors: &mut Vec<String>,
) {
    let mut seen = AHashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(format!("Duplicate {} id '{}'", label, id));
        }
    }
}
