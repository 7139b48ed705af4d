//! Overworld simulation phases
//!
//! A second consumer of the tick substrate: coarse world-level phases that
//! advance the apocalypse, faction diplomacy, settlement economies, the
//! oracle's mood and the legend log. Runs under the same scheduler contract
//! as base mode - fixed phase order, per-tick reseeded channels, normalize
//! then announce.

use crate::core::error::{SimError, SimResult};
use crate::core::events::EventBus;
use crate::core::rng::{combine_seed, fnv1a, RngChannel, RngRegistry};
use crate::sim::scheduler::{TickContext, TickSystem};
use crate::world::data::{EventRecord, EventType, LegendEntry, RelationState, WorldState};
use crate::world::normalize::normalize;

/// Per-tick context for overworld phases.
pub struct OverworldCx<'a> {
    pub world: &'a mut WorldState,
    pub tick: u64,
    pub bus: &'a EventBus,
    rng: &'a RngRegistry,
}

impl OverworldCx<'_> {
    /// Fetch the channel `simulation.<name>`, reseeded for this tick.
    pub fn channel(&self, name: &str) -> SimResult<RngChannel> {
        if name.trim().is_empty() {
            return Err(SimError::InvalidArgument(
                "channel name must be provided".to_string(),
            ));
        }
        let channel = self.rng.channel(&format!("simulation.{}", name))?;
        let offset = combine_seed(&[
            self.world.seed & 0xFFFF_FFFF,
            self.tick & 0xFFFF_FFFF,
            fnv1a(name.as_bytes()),
        ]);
        channel.reseed(offset as i64);
        Ok(channel)
    }
}

/// One overworld phase, run in fixed order each tick.
pub trait OverworldPhase: Send {
    fn name(&self) -> &'static str;
    fn execute(&mut self, cx: &mut OverworldCx<'_>) -> SimResult<()>;
}

/// Tick-scheduler entry point for the overworld.
pub struct OverworldSimulation {
    phases: Vec<Box<dyn OverworldPhase>>,
}

impl OverworldSimulation {
    pub fn new(phases: Vec<Box<dyn OverworldPhase>>) -> SimResult<Self> {
        if phases.is_empty() {
            return Err(SimError::InvalidArgument(
                "at least one overworld phase must be provided".to_string(),
            ));
        }
        Ok(Self { phases })
    }

    /// The default phase stack, in run order.
    pub fn with_default_phases() -> Self {
        Self {
            phases: vec![
                Box::new(HazardPropagationPhase),
                Box::new(FactionDiplomacyPhase),
                Box::new(SettlementLogisticsPhase),
                Box::new(OracleReviewPhase),
                Box::new(LegendCompilationPhase),
            ],
        }
    }
}

impl TickSystem for OverworldSimulation {
    fn tick(&mut self, world: &mut WorldState, ctx: &TickContext<'_>) -> SimResult<()> {
        {
            let mut cx = OverworldCx {
                world: &mut *world,
                tick: ctx.tick,
                bus: ctx.bus,
                rng: ctx.rng,
            };
            for phase in &mut self.phases {
                phase.execute(&mut cx)?;
            }
        }

        normalize(world);
        ctx.bus.publish(OverworldTickCompleted { tick: ctx.tick });
        Ok(())
    }
}

/// All overworld phases have run for this tick.
#[derive(Debug, Clone, Copy)]
pub struct OverworldTickCompleted {
    pub tick: u64,
}

/// A new legend entry was compiled this tick.
#[derive(Debug, Clone)]
pub struct OverworldLegendUpdated {
    pub event_id: String,
}

pub struct HazardPropagationPhase;

impl OverworldPhase for HazardPropagationPhase {
    fn name(&self) -> &'static str {
        "hazards"
    }

    fn execute(&mut self, cx: &mut OverworldCx<'_>) -> SimResult<()> {
        let channel = cx.channel(self.name())?;
        let severity_delta = (channel.next_float01() * 0.06 - 0.03) as f32;
        let severity = (cx.world.apocalypse.severity + severity_delta).clamp(0.0, 1.0);
        cx.world.apocalypse.severity = severity;

        if severity < 0.6 {
            return Ok(());
        }

        for tile in &mut cx.world.tiles {
            if tile.temperature > 0.7 && !tile.hazard_tags.iter().any(|t| t == "haz_scorch_wave")
            {
                tile.hazard_tags.push("haz_scorch_wave".to_string());
            }
        }
        Ok(())
    }
}

pub struct FactionDiplomacyPhase;

impl OverworldPhase for FactionDiplomacyPhase {
    fn name(&self) -> &'static str {
        "diplomacy"
    }

    fn execute(&mut self, cx: &mut OverworldCx<'_>) -> SimResult<()> {
        for faction_index in 0..cx.world.factions.len() {
            for relation_index in 0..cx.world.factions[faction_index].relations.len() {
                let (faction_id, target_id) = {
                    let faction = &cx.world.factions[faction_index];
                    (
                        faction.id.clone(),
                        faction.relations[relation_index].target_faction_id.clone(),
                    )
                };

                let channel =
                    cx.channel(&format!("{}.{}.{}", self.name(), faction_id, target_id))?;
                let delta = (channel.next_float01() * 0.1 - 0.05) as f32;

                let relation = &mut cx.world.factions[faction_index].relations[relation_index];
                relation.standing = (relation.standing + delta).clamp(0.0, 1.0);
                relation.state = if relation.standing > 0.65 {
                    RelationState::Allied
                } else if relation.standing < 0.35 {
                    RelationState::Hostile
                } else {
                    RelationState::Neutral
                };
            }
        }
        Ok(())
    }
}

pub struct SettlementLogisticsPhase;

impl OverworldPhase for SettlementLogisticsPhase {
    fn name(&self) -> &'static str {
        "logistics"
    }

    fn execute(&mut self, cx: &mut OverworldCx<'_>) -> SimResult<()> {
        for index in 0..cx.world.settlements.len() {
            let settlement_id = cx.world.settlements[index].id.clone();
            let channel = cx.channel(&format!("{}.{}", self.name(), settlement_id))?;
            let production_delta = (channel.next_float01() * 0.08 - 0.04) as f32;
            let trade_delta = (channel.next_float01() * 0.06 - 0.03) as f32;
            let research_delta = (channel.next_float01() * 0.05 - 0.025) as f32;

            let settlement = &mut cx.world.settlements[index];
            settlement.economy.production =
                (settlement.economy.production + production_delta).clamp(0.0, 3.0);
            settlement.economy.trade = (settlement.economy.trade + trade_delta).clamp(0.0, 3.0);
            settlement.economy.research =
                (settlement.economy.research + research_delta).clamp(0.0, 3.0);
            settlement.defense_rating =
                (settlement.defense_rating + production_delta * 0.25).clamp(0.0, 5.0);
        }
        Ok(())
    }
}

pub struct OracleReviewPhase;

impl OverworldPhase for OracleReviewPhase {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn execute(&mut self, cx: &mut OverworldCx<'_>) -> SimResult<()> {
        let channel = cx.channel(self.name())?;
        let tension_delta = (channel.next_float01() * 0.08 - 0.04) as f32;
        let severity_influence = (cx.world.apocalypse.severity - 0.5) * 0.1;

        let oracle = &mut cx.world.oracle_state;
        let new_tension =
            (oracle.tension_score + tension_delta + severity_influence).clamp(0.0, 1.0);
        oracle.tension_score = new_tension;

        for remaining in oracle.cooldowns.values_mut() {
            *remaining = (*remaining - 1).max(0);
        }

        // Escalate to the heaviest deck while tension runs high.
        if new_tension > 0.6 {
            if let Some(deck) = oracle
                .available_decks
                .iter()
                .max_by(|a, b| a.tier.cmp(&b.tier).then_with(|| b.id.cmp(&a.id)))
            {
                oracle.active_deck_id = deck.id.clone();
            }
        }
        Ok(())
    }
}

pub struct LegendCompilationPhase;

impl OverworldPhase for LegendCompilationPhase {
    fn name(&self) -> &'static str {
        "legends"
    }

    fn execute(&mut self, cx: &mut OverworldCx<'_>) -> SimResult<()> {
        let event_id = format!("event_tick_{:06}", cx.tick);
        if cx.world.events.iter().any(|e| e.id == event_id) {
            return Ok(());
        }

        let actors = cx
            .world
            .characters
            .first()
            .map(|c| vec![c.id.clone()])
            .unwrap_or_default();
        let location_id = cx
            .world
            .settlements
            .first()
            .map(|s| s.id.clone())
            .unwrap_or_else(|| cx.world.base_state.site_tile_id.clone());

        cx.world.events.push(EventRecord {
            id: event_id.clone(),
            timestamp: cx.tick as i64,
            event_type: EventType::Mandate,
            actors,
            location_id,
            details: [
                (
                    "apocalypseSeverity".to_string(),
                    format!("{:.2}", cx.world.apocalypse.severity),
                ),
                (
                    "tension".to_string(),
                    format!("{:.2}", cx.world.oracle_state.tension_score),
                ),
            ]
            .into(),
        });
        cx.world.legends.push(LegendEntry {
            id: format!("legend_tick_{:06}", cx.tick),
            summary: format!("Year {}: factions adapt to the wastes.", cx.tick),
            event_ids: vec![event_id.clone()],
        });

        cx.bus.publish(OverworldLegendUpdated { event_id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::SimClock;
    use crate::core::rng::RngRegistry;
    use crate::sim::scheduler::TickScheduler;
    use crate::testutil::sample_world;
    use std::sync::Arc;

    fn run_overworld(world: &mut WorldState, ticks: u64) {
        let mut scheduler = TickScheduler::new(
            SimClock::new(1, 24).unwrap(),
            Arc::new(RngRegistry::new(world.seed)),
            Arc::new(EventBus::new()),
        );
        scheduler.register_system(Box::new(OverworldSimulation::with_default_phases()));
        scheduler.advance(world, ticks).unwrap();
    }

    #[test]
    fn test_overworld_ticks_are_deterministic() {
        let mut world_a = sample_world();
        let mut world_b = sample_world();
        run_overworld(&mut world_a, 10);
        run_overworld(&mut world_b, 10);
        assert_eq!(world_a, world_b);
    }

    #[test]
    fn test_severity_stays_clamped() {
        let mut world = sample_world();
        world.apocalypse.severity = 1.0;
        run_overworld(&mut world, 50);
        assert!((0.0..=1.0).contains(&world.apocalypse.severity));
    }

    #[test]
    fn test_legends_accumulate_one_per_tick() {
        let mut world = sample_world();
        let legends_before = world.legends.len();
        run_overworld(&mut world, 5);
        assert_eq!(world.legends.len(), legends_before + 5);
        assert!(world.events.iter().any(|e| e.id == "event_tick_000003"));
    }

    #[test]
    fn test_oracle_review_steps_cooldowns() {
        let mut world = sample_world();
        world
            .oracle_state
            .cooldowns
            .insert("card_rise_nemesis".to_string(), 3);
        run_overworld(&mut world, 2);
        assert_eq!(world.oracle_state.cooldowns["card_rise_nemesis"], 1);
    }

    #[test]
    fn test_diplomacy_keeps_standing_in_range() {
        let mut world = sample_world();
        run_overworld(&mut world, 30);
        for faction in &world.factions {
            for relation in &faction.relations {
                assert!((0.0..=1.0).contains(&relation.standing));
            }
        }
    }
}
