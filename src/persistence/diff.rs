//! Incremental diffs between base-state snapshots
//!
//! Computes minimal patches describing how one [`BaseState`] became
//! another, for incremental persistence: applying `compute(prev, next)` to
//! a clone of `prev` reproduces `next` field for field. Float comparisons
//! use an epsilon of 1e-4.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::world::data::{AlertLevel, BaseState, BaseZone, ItemStack, ResearchState};

const FLOAT_EPSILON: f32 = 1e-4;

/// A minimal patch between two base-state snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseStateDiff {
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub site_tile_id: Option<String>,
    #[serde(default)]
    pub alert_level: Option<AlertLevel>,
    #[serde(default)]
    pub upserted_zones: Vec<BaseZone>,
    #[serde(default)]
    pub removed_zone_ids: Vec<String>,
    #[serde(default)]
    pub added_population: Vec<String>,
    #[serde(default)]
    pub removed_population: Vec<String>,
    #[serde(default)]
    pub upserted_infrastructure: BTreeMap<String, f32>,
    #[serde(default)]
    pub removed_infrastructure_keys: Vec<String>,
    #[serde(default)]
    pub upserted_inventory: Vec<ItemStack>,
    #[serde(default)]
    pub removed_inventory_item_ids: Vec<String>,
    #[serde(default)]
    pub research: Option<ResearchState>,
}

impl BaseStateDiff {
    pub fn is_empty(&self) -> bool {
        self == &BaseStateDiff::default()
    }
}

/// Computes and applies [`BaseStateDiff`] patches.
pub struct BaseStateDiffCalculator;

impl BaseStateDiffCalculator {
    pub fn compute(previous: &BaseState, next: &BaseState) -> BaseStateDiff {
        let mut diff = BaseStateDiff::default();

        if previous.active != next.active {
            diff.active = Some(next.active);
        }
        if previous.site_tile_id != next.site_tile_id {
            diff.site_tile_id = Some(next.site_tile_id.clone());
        }
        if previous.alert_level != next.alert_level {
            diff.alert_level = Some(next.alert_level);
        }

        Self::compute_zone_diff(previous, next, &mut diff);
        Self::compute_population_diff(previous, next, &mut diff);
        Self::compute_infrastructure_diff(previous, next, &mut diff);
        Self::compute_inventory_diff(previous, next, &mut diff);

        if research_changed(&previous.research, &next.research) {
            diff.research = Some(next.research.clone());
        }

        diff
    }

    pub fn apply(target: &mut BaseState, diff: &BaseStateDiff) {
        if let Some(active) = diff.active {
            target.active = active;
        }
        if let Some(site_tile_id) = &diff.site_tile_id {
            target.site_tile_id = site_tile_id.clone();
        }
        if let Some(alert_level) = diff.alert_level {
            target.alert_level = alert_level;
        }

        Self::apply_zone_diff(target, diff);
        Self::apply_population_diff(target, diff);
        Self::apply_infrastructure_diff(target, diff);
        Self::apply_inventory_diff(target, diff);

        if let Some(research) = &diff.research {
            target.research = research.clone();
        }
    }

    fn compute_zone_diff(previous: &BaseState, next: &BaseState, diff: &mut BaseStateDiff) {
        let previous_lookup: AHashMap<&str, &BaseZone> =
            previous.zones.iter().map(|z| (z.id.as_str(), z)).collect();
        let next_ids: AHashSet<&str> = next.zones.iter().map(|z| z.id.as_str()).collect();

        for zone in &next.zones {
            match previous_lookup.get(zone.id.as_str()) {
                Some(prior) if zones_equal(prior, zone) => {}
                _ => diff.upserted_zones.push(zone.clone()),
            }
        }

        for zone in &previous.zones {
            if !next_ids.contains(zone.id.as_str()) {
                diff.removed_zone_ids.push(zone.id.clone());
            }
        }
    }

    fn compute_population_diff(previous: &BaseState, next: &BaseState, diff: &mut BaseStateDiff) {
        let previous_set: AHashSet<&str> =
            previous.population.iter().map(String::as_str).collect();
        let next_set: AHashSet<&str> = next.population.iter().map(String::as_str).collect();

        for member in &next.population {
            if !previous_set.contains(member.as_str()) {
                diff.added_population.push(member.clone());
            }
        }
        for member in &previous.population {
            if !next_set.contains(member.as_str()) {
                diff.removed_population.push(member.clone());
            }
        }
    }

    fn compute_infrastructure_diff(
        previous: &BaseState,
        next: &BaseState,
        diff: &mut BaseStateDiff,
    ) {
        for (key, value) in &next.infrastructure {
            match previous.infrastructure.get(key) {
                Some(prior) if float_equal(*prior, *value) => {}
                _ => {
                    diff.upserted_infrastructure.insert(key.clone(), *value);
                }
            }
        }
        for key in previous.infrastructure.keys() {
            if !next.infrastructure.contains_key(key) {
                diff.removed_infrastructure_keys.push(key.clone());
            }
        }
    }

    fn compute_inventory_diff(previous: &BaseState, next: &BaseState, diff: &mut BaseStateDiff) {
        let previous_lookup: AHashMap<&str, i64> = previous
            .inventory
            .iter()
            .map(|stack| (stack.item_id.as_str(), stack.quantity))
            .collect();
        let next_ids: AHashSet<&str> = next
            .inventory
            .iter()
            .map(|stack| stack.item_id.as_str())
            .collect();

        for stack in &next.inventory {
            match previous_lookup.get(stack.item_id.as_str()) {
                Some(prior) if *prior == stack.quantity => {}
                _ => diff.upserted_inventory.push(stack.clone()),
            }
        }
        for stack in &previous.inventory {
            if !next_ids.contains(stack.item_id.as_str()) {
                diff.removed_inventory_item_ids.push(stack.item_id.clone());
            }
        }
    }

    fn apply_zone_diff(target: &mut BaseState, diff: &BaseStateDiff) {
        for zone in &diff.upserted_zones {
            match target.zones.iter_mut().find(|z| z.id == zone.id) {
                Some(existing) => {
                    existing.name = zone.name.clone();
                    existing.r#type = zone.r#type;
                    existing.efficiency = zone.efficiency;
                }
                None => target.zones.push(zone.clone()),
            }
        }

        if !diff.removed_zone_ids.is_empty() {
            target
                .zones
                .retain(|zone| !diff.removed_zone_ids.contains(&zone.id));
        }
    }

    fn apply_population_diff(target: &mut BaseState, diff: &BaseStateDiff) {
        for member in &diff.added_population {
            if !target.population.contains(member) {
                target.population.push(member.clone());
            }
        }
        if !diff.removed_population.is_empty() {
            target
                .population
                .retain(|member| !diff.removed_population.contains(member));
        }
    }

    fn apply_infrastructure_diff(target: &mut BaseState, diff: &BaseStateDiff) {
        for (key, value) in &diff.upserted_infrastructure {
            target.infrastructure.insert(key.clone(), *value);
        }
        for key in &diff.removed_infrastructure_keys {
            target.infrastructure.remove(key);
        }
    }

    fn apply_inventory_diff(target: &mut BaseState, diff: &BaseStateDiff) {
        for stack in &diff.upserted_inventory {
            match target
                .inventory
                .iter_mut()
                .find(|item| item.item_id == stack.item_id)
            {
                Some(existing) => existing.quantity = stack.quantity,
                None => target.inventory.push(stack.clone()),
            }
        }
        if !diff.removed_inventory_item_ids.is_empty() {
            target
                .inventory
                .retain(|item| !diff.removed_inventory_item_ids.contains(&item.item_id));
        }
    }
}

fn zones_equal(left: &BaseZone, right: &BaseZone) -> bool {
    left.id == right.id
        && left.name == right.name
        && left.r#type == right.r#type
        && float_equal(left.efficiency, right.efficiency)
}

fn research_changed(previous: &ResearchState, next: &ResearchState) -> bool {
    previous.active_project_id != next.active_project_id
        || !float_equal(previous.active_progress, next.active_progress)
        || previous.completed_projects != next.completed_projects
}

fn float_equal(a: f32, b: f32) -> bool {
    (a - b).abs() < FLOAT_EPSILON
}
