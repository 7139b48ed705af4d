//! Zone maintenance system
//!
//! First system each tick. Drifts zone morale with per-zone entropy, accrues
//! wear, re-derives efficiency from morale/wear/infrastructure, lets
//! watchtowers bleed off raid threat, and applies the daily grind of
//! infrastructure decay.

use std::collections::BTreeMap;

use crate::base::{BaseCx, BaseSystem};
use crate::core::error::SimResult;
use crate::world::data::{BaseState, ZoneType};

pub struct ZoneMaintenanceSystem;

impl BaseSystem for ZoneMaintenanceSystem {
    fn name(&self) -> &'static str {
        "zones"
    }

    fn run(&mut self, cx: &mut BaseCx<'_>) -> SimResult<()> {
        for index in 0..cx.world.base_state.zones.len() {
            let (zone_id, zone_type) = {
                let zone = &cx.world.base_state.zones[index];
                (zone.id.clone(), zone.r#type)
            };

            let channel = cx.channel(&format!("{}.{}", self.name(), zone_id))?;
            let morale_drift = (channel.next_float01() * 0.1 - 0.05) as f32;
            let factor =
                infrastructure_factor(&cx.world.base_state.infrastructure, zone_type);

            let Some(zone_runtime) = cx.runtime.zones.get_mut(&zone_id) else {
                continue;
            };

            zone_runtime.morale_modifier =
                (zone_runtime.morale_modifier + morale_drift + factor * 0.05).clamp(0.1, 1.5);

            let wear_delta = 0.015 - zone_runtime.morale_modifier * 0.01 - factor * 0.01;
            zone_runtime.wear = (zone_runtime.wear + wear_delta).clamp(0.0, 1.0);

            let efficiency_delta =
                zone_runtime.morale_modifier * 0.03 - zone_runtime.wear * 0.025 + factor * 0.02;
            let zone = &mut cx.world.base_state.zones[index];
            zone.efficiency = (zone.efficiency + efficiency_delta).clamp(0.3, 1.35);

            if zone_type == ZoneType::Watchtower {
                let threat = &mut cx.runtime.raid_threat.threat_meter;
                *threat = (*threat - zone.efficiency * 0.01).clamp(0.0, 1.0);
            }
        }

        apply_infrastructure_decay(&mut cx.world.base_state);
        Ok(())
    }
}

/// Mean of the stats relevant to this zone type. Absent stats read as 0.5;
/// an entirely empty infrastructure map contributes nothing.
fn infrastructure_factor(infrastructure: &BTreeMap<String, f32>, zone_type: ZoneType) -> f32 {
    if infrastructure.is_empty() {
        return 0.0;
    }

    let stat = |key: &str| infrastructure.get(key).copied().unwrap_or(0.5);
    let power = stat("power");
    let water = stat("water");
    let morale = stat("morale");
    let defense = stat("defense");

    match zone_type {
        ZoneType::Habitat => (power + water + morale) / 3.0,
        ZoneType::Workshop | ZoneType::ResearchLab => (power + morale) / 2.0,
        ZoneType::Farm => (water + morale) / 2.0,
        ZoneType::Watchtower => (power + defense) / 2.0,
    }
}

fn apply_infrastructure_decay(state: &mut BaseState) {
    for key in ["power", "water", "morale"] {
        match state.infrastructure.get(key).copied() {
            Some(value) => {
                state
                    .infrastructure
                    .insert(key.to_string(), (value - 0.01).clamp(0.0, 1.5));
            }
            None => {
                state.infrastructure.insert(key.to_string(), 0.5);
            }
        }
    }

    if !state.infrastructure.contains_key("defense") {
        state.infrastructure.insert("defense".to_string(), 0.4);
    }
}
