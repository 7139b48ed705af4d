//! Canonical ordering for world snapshots
//!
//! Normalization makes snapshot serialization order-independent and
//! reproducible: every array is sorted by a canonical key (ids ordinally,
//! events by timestamp-then-id) and every string-keyed map is a `BTreeMap`,
//! so two logically identical worlds serialize to identical bytes no matter
//! what order their collections were built in. The pass is idempotent and
//! runs after every base tick and inside serialize/deserialize.

use crate::world::data::WorldState;

/// Put every collection in `world` into canonical order.
pub fn normalize(world: &mut WorldState) {
    world.tiles.sort_by(|a, b| a.id.cmp(&b.id));

    world.factions.sort_by(|a, b| a.id.cmp(&b.id));
    for faction in &mut world.factions {
        faction
            .relations
            .sort_by(|a, b| a.target_faction_id.cmp(&b.target_faction_id));
        faction.noble_roster.sort_by(|a, b| {
            a.role
                .cmp(&b.role)
                .then_with(|| a.character_id.cmp(&b.character_id))
        });
        faction.holdings.sort();
    }

    world.settlements.sort_by(|a, b| a.id.cmp(&b.id));

    world.characters.sort_by(|a, b| a.id.cmp(&b.id));
    for character in &mut world.characters {
        character.traits.sort();
        character.relationships.sort_by(|a, b| {
            a.target_id
                .cmp(&b.target_id)
                .then_with(|| a.r#type.cmp(&b.r#type))
        });
    }

    world.events.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });
    for event in &mut world.events {
        event.actors.sort();
    }

    world.oracle_state.available_decks.sort_by(|a, b| {
        a.tier.cmp(&b.tier).then_with(|| a.id.cmp(&b.id))
    });
    for deck in &mut world.oracle_state.available_decks {
        deck.cards.sort_by(|a, b| a.id.cmp(&b.id));
        for card in &mut deck.cards {
            // Stable sort: effects of one type keep their authored order,
            // which is the order the incident interpreter applies them in.
            card.effects
                .sort_by(|a, b| a.effect_type.cmp(&b.effect_type));
        }
    }

    world.legends.sort_by(|a, b| a.id.cmp(&b.id));
    for legend in &mut world.legends {
        legend.event_ids.sort();
    }

    world.apocalypse.era_timeline.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.description.cmp(&b.description))
    });

    let base = &mut world.base_state;
    base.zones.sort_by(|a, b| a.id.cmp(&b.id));
    base.population.sort();
    base.inventory
        .sort_by(|a, b| a.item_id.cmp(&b.item_id));
    base.research.completed_projects.sort();
}

/// Compare two normalized worlds for canonical equality.
///
/// Only meaningful after both sides have been normalized; callers that want
/// byte equality should compare serialized documents instead.
pub fn canonical_eq(a: &WorldState, b: &WorldState) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::data::*;

    fn scrambled_world() -> WorldState {
        let mut world = WorldState::default();
        world.tiles = vec![
            Tile {
                id: "tile_b".into(),
                ..Tile::default()
            },
            Tile {
                id: "tile_a".into(),
                ..Tile::default()
            },
        ];
        world.events = vec![
            EventRecord {
                id: "event_b".into(),
                timestamp: 5,
                ..EventRecord::default()
            },
            EventRecord {
                id: "event_a".into(),
                timestamp: 5,
                ..EventRecord::default()
            },
            EventRecord {
                id: "event_z".into(),
                timestamp: 1,
                ..EventRecord::default()
            },
        ];
        world.base_state.zones = vec![
            BaseZone {
                id: "zone_b".into(),
                ..BaseZone::default()
            },
            BaseZone {
                id: "zone_a".into(),
                ..BaseZone::default()
            },
        ];
        world.base_state.population = vec!["char_b".into(), "char_a".into()];
        world
    }

    #[test]
    fn test_normalize_sorts_collections() {
        let mut world = scrambled_world();
        normalize(&mut world);

        assert_eq!(world.tiles[0].id, "tile_a");
        assert_eq!(world.events[0].id, "event_z");
        assert_eq!(world.events[1].id, "event_a");
        assert_eq!(world.events[2].id, "event_b");
        assert_eq!(world.base_state.zones[0].id, "zone_a");
        assert_eq!(world.base_state.population, vec!["char_a", "char_b"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut once = scrambled_world();
        normalize(&mut once);
        let mut twice = once.clone();
        normalize(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_is_insertion_order_independent() {
        let mut forward = scrambled_world();
        let mut reversed = scrambled_world();
        reversed.tiles.reverse();
        reversed.events.reverse();
        reversed.base_state.zones.reverse();
        reversed.base_state.population.reverse();

        normalize(&mut forward);
        normalize(&mut reversed);
        assert!(canonical_eq(&forward, &reversed));
    }

    #[test]
    fn test_effect_order_within_type_is_preserved() {
        let mut world = WorldState::default();
        world.oracle_state.available_decks.push(EventDeck {
            id: "deck".into(),
            cards: vec![EventCard {
                id: "card".into(),
                effects: vec![
                    EventEffect {
                        effect_type: "adjust_infrastructure".into(),
                        parameters: [("stat".to_string(), "power".to_string())].into(),
                    },
                    EventEffect {
                        effect_type: "add_inventory".into(),
                        parameters: Default::default(),
                    },
                    EventEffect {
                        effect_type: "adjust_infrastructure".into(),
                        parameters: [("stat".to_string(), "water".to_string())].into(),
                    },
                ],
                ..EventCard::default()
            }],
            ..EventDeck::default()
        });

        normalize(&mut world);

        let effects = &world.oracle_state.available_decks[0].cards[0].effects;
        assert_eq!(effects[0].effect_type, "add_inventory");
        // The two adjust_infrastructure effects keep their authored order.
        assert_eq!(effects[1].parameters["stat"], "power");
        assert_eq!(effects[2].parameters["stat"], "water");
    }
}
