//! Oracle synchronizer and incident resolution
//!
//! Two halves of the oracle pipeline. The synchronizer is the producer:
//! raid and mandate outcomes nudge the tension score and may draw a card
//! from the active deck - uniformly among cooldown-free cards - publishing
//! an incident event with a deep clone of the card's effects. The incident
//! system is the consumer: it buffers injected incidents, steps card
//! cooldowns, applies each incident's ordered effect list through a
//! string-keyed interpreter and records what happened as a world event.
//!
//! Card weights are tracked and rebalanced toward their deck baselines, but
//! selection never consults them.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use ahash::AHashSet;

use crate::base::runtime::{Job, JobPriority, JobType, MandateResolution, MandateStatus};
use crate::base::{adjust_infrastructure, BaseCx, BaseSystem, OracleIncidentInjected};
use crate::core::error::{SimError, SimResult};
use crate::core::events::{EventBus, Subscription};
use crate::world::data::{AlertLevel, EventEffect, EventRecord, EventType, ItemStack, WorldState};

const RAID_TENSION_INCREASE: f32 = 0.08;
const MANDATE_COMPLETION_DELTA: f32 = -0.05;
const MANDATE_FAILURE_DELTA: f32 = 0.06;

/// Step by which card weights move back toward their baselines each tick.
const WEIGHT_RECOVERY_STEP: f32 = 0.05;

/// Record a resolved raid: bump tension and try to draw a card.
pub(crate) fn record_raid_outcome(
    cx: &mut BaseCx<'_>,
    attacker_faction_id: &str,
    event_id: &str,
) -> SimResult<()> {
    let oracle = &mut cx.world.oracle_state;
    oracle.tension_score = (oracle.tension_score + RAID_TENSION_INCREASE).clamp(0.0, 1.0);

    let trigger_parameters: BTreeMap<String, String> = [
        ("attacker".to_string(), attacker_faction_id.to_string()),
        ("eventId".to_string(), event_id.to_string()),
    ]
    .into();

    try_inject_incident(cx, "raid", trigger_parameters)
}

/// Record a mandate outcome: shift tension by result and try to draw a card.
pub(crate) fn record_mandate_outcome(
    cx: &mut BaseCx<'_>,
    resolution: &MandateResolution,
) -> SimResult<()> {
    let delta = match resolution.result {
        MandateStatus::Completed => MANDATE_COMPLETION_DELTA,
        MandateStatus::Failed => MANDATE_FAILURE_DELTA,
        MandateStatus::Active => 0.0,
    };
    if delta != 0.0 {
        let oracle = &mut cx.world.oracle_state;
        oracle.tension_score = (oracle.tension_score + delta).clamp(0.0, 1.0);
    }

    let trigger_parameters: BTreeMap<String, String> = [
        ("mandateId".to_string(), resolution.mandate.id.clone()),
        ("result".to_string(), resolution.result.as_str().to_string()),
    ]
    .into();

    try_inject_incident(cx, "mandate", trigger_parameters)
}

fn try_inject_incident(
    cx: &mut BaseCx<'_>,
    trigger: &str,
    trigger_parameters: BTreeMap<String, String>,
) -> SimResult<()> {
    let oracle = &cx.world.oracle_state;
    if oracle.active_deck_id.is_empty() {
        return Ok(());
    }
    let Some(deck) = oracle
        .available_decks
        .iter()
        .find(|deck| deck.id == oracle.active_deck_id)
    else {
        return Ok(());
    };

    let available: Vec<usize> = deck
        .cards
        .iter()
        .enumerate()
        .filter(|(_, card)| {
            !card.id.is_empty()
                && oracle
                    .cooldowns
                    .get(&card.id)
                    .map(|remaining| *remaining <= 0)
                    .unwrap_or(true)
        })
        .map(|(index, _)| index)
        .collect();

    if available.is_empty() {
        return Ok(());
    }

    let channel = cx.channel(&format!("oracle.{}.{}", trigger, deck.id))?;
    let pick = channel.next_int(0, available.len() as i64)? as usize;
    let card = &deck.cards[available[pick]];

    let deck_id = deck.id.clone();
    let card_id = card.id.clone();
    let narrative = card.narrative.clone();
    // Deep clone: dispatched effects never alias the deck template.
    let effects: Vec<EventEffect> = card.effects.clone();

    let cooldown = cx.runtime.incident_cooldown;
    cx.world
        .oracle_state
        .cooldowns
        .insert(card_id.clone(), cooldown);

    tracing::debug!(deck = %deck_id, card = %card_id, trigger, "oracle incident injected");
    cx.bus.publish(OracleIncidentInjected {
        deck_id,
        card_id,
        narrative,
        trigger: trigger.to_string(),
        trigger_parameters,
        effects,
        tick: cx.tick,
    });
    Ok(())
}

/// Event-consumer system closing the oracle loop.
///
/// Runs last each tick: steps cooldowns (sparing cards drawn this tick, so
/// a fresh draw keeps its full cooldown), drains the incident inbox through
/// the effect interpreter, then nudges card weights toward the baselines
/// cached at construction.
pub struct OracleIncidentSystem {
    inbox: Arc<Mutex<VecDeque<OracleIncidentInjected>>>,
    subscription: Subscription,
    baselines: BTreeMap<String, f32>,
}

impl Drop for OracleIncidentSystem {
    fn drop(&mut self) {
        self.subscription.dispose();
    }
}

impl OracleIncidentSystem {
    pub fn new(bus: &EventBus, world: &WorldState) -> Self {
        let inbox = Arc::new(Mutex::new(VecDeque::new()));
        let sink = Arc::clone(&inbox);
        let subscription = bus.subscribe::<OracleIncidentInjected, _>(move |incident| {
            sink.lock()
                .expect("oracle inbox lock poisoned")
                .push_back(incident.clone());
        });

        let baselines = world
            .oracle_state
            .available_decks
            .iter()
            .flat_map(|deck| {
                deck.cards
                    .iter()
                    .map(move |card| (weight_key(&deck.id, &card.id), card.weight))
            })
            .collect();

        Self {
            inbox,
            subscription,
            baselines,
        }
    }

    fn drain_inbox(&self) -> Vec<OracleIncidentInjected> {
        let mut inbox = self.inbox.lock().expect("oracle inbox lock poisoned");
        inbox.drain(..).collect()
    }
}

impl BaseSystem for OracleIncidentSystem {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn run(&mut self, cx: &mut BaseCx<'_>) -> SimResult<()> {
        let pending = self.drain_inbox();

        // Cards drawn this tick keep their freshly-set cooldown.
        let fresh: AHashSet<&str> = pending.iter().map(|i| i.card_id.as_str()).collect();
        for (card_id, remaining) in cx.world.oracle_state.cooldowns.iter_mut() {
            if !fresh.contains(card_id.as_str()) {
                *remaining = (*remaining - 1).max(0);
            }
        }

        for incident in pending {
            apply_incident(&incident, cx)?;
        }

        for deck in &mut cx.world.oracle_state.available_decks {
            for card in &mut deck.cards {
                if let Some(&baseline) = self.baselines.get(&weight_key(&deck.id, &card.id)) {
                    card.weight = step_toward(card.weight, baseline, WEIGHT_RECOVERY_STEP);
                }
            }
        }

        Ok(())
    }
}

fn weight_key(deck_id: &str, card_id: &str) -> String {
    format!("{}/{}", deck_id, card_id)
}

fn step_toward(current: f32, target: f32, step: f32) -> f32 {
    if (current - target).abs() <= step {
        target
    } else if current < target {
        current + step
    } else {
        current - step
    }
}

fn apply_incident(incident: &OracleIncidentInjected, cx: &mut BaseCx<'_>) -> SimResult<()> {
    let mut details = incident.trigger_parameters.clone();
    details.insert("deck".to_string(), incident.deck_id.clone());
    details.insert("card".to_string(), incident.card_id.clone());
    details.insert("trigger".to_string(), incident.trigger.clone());

    for (index, effect) in incident.effects.iter().enumerate() {
        let applied = apply_effect(effect, index, incident, cx)?;
        details.insert(format!("effect_{:02}", index), applied);
    }

    cx.world.events.push(EventRecord {
        id: format!("incident_{}_{:06}", incident.card_id, incident.tick),
        timestamp: incident.tick as i64,
        event_type: EventType::Catastrophe,
        actors: Vec::new(),
        location_id: cx.world.base_state.site_tile_id.clone(),
        details,
    });
    Ok(())
}

/// Apply one effect. Returns a short description for the incident's details
/// map. Missing targets or malformed parameters make the effect a no-op for
/// this step; an unrecognized effect type is a fatal programming error.
fn apply_effect(
    effect: &EventEffect,
    index: usize,
    incident: &OracleIncidentInjected,
    cx: &mut BaseCx<'_>,
) -> SimResult<String> {
    let params = &effect.parameters;
    match effect.effect_type.as_str() {
        "adjust_infrastructure" => {
            let (Some(stat), Some(delta)) = (params.get("stat"), param_f32(params, "delta"))
            else {
                return Ok("skipped: missing stat or delta".to_string());
            };
            adjust_infrastructure(&mut cx.world.base_state.infrastructure, stat, delta, 0.4);
            Ok(format!("{}{:+.2}", stat, delta))
        }
        "adjust_tension" => {
            let Some(delta) = param_f32(params, "delta") else {
                return Ok("skipped: missing delta".to_string());
            };
            let oracle = &mut cx.world.oracle_state;
            oracle.tension_score = (oracle.tension_score + delta).clamp(0.0, 1.0);
            Ok(format!("tension{:+.2}", delta))
        }
        "add_inventory" => {
            let Some(item_id) = params.get("item") else {
                return Ok("skipped: missing item".to_string());
            };
            let quantity = param_i64(params, "quantity").unwrap_or(1);
            match cx
                .world
                .base_state
                .inventory
                .iter_mut()
                .find(|stack| &stack.item_id == item_id)
            {
                Some(stack) => stack.quantity += quantity,
                None => cx.world.base_state.inventory.push(ItemStack {
                    item_id: item_id.clone(),
                    quantity,
                }),
            }
            Ok(format!("{}{:+}", item_id, quantity))
        }
        "adjust_zone_morale" => {
            let (Some(zone_id), Some(delta)) = (params.get("zone"), param_f32(params, "delta"))
            else {
                return Ok("skipped: missing zone or delta".to_string());
            };
            let Some(zone_runtime) = cx.runtime.zones.get_mut(zone_id) else {
                return Ok(format!("skipped: no zone '{}'", zone_id));
            };
            zone_runtime.morale_modifier =
                (zone_runtime.morale_modifier + delta).clamp(0.1, 1.5);
            Ok(format!("{} morale{:+.2}", zone_id, delta))
        }
        "schedule_job" => {
            let Some(job_type) = params.get("type").and_then(|t| parse_job_type(t)) else {
                return Ok("skipped: missing or unknown job type".to_string());
            };
            let duration = param_i64(params, "duration").unwrap_or(6).max(1);
            let job_id = params
                .get("job")
                .cloned()
                .unwrap_or_else(|| format!("job_incident_{}_{:06}", incident.card_id, incident.tick));
            cx.runtime.job_board.enqueue(Job {
                id: job_id.clone(),
                job_type,
                priority: params
                    .get("priority")
                    .and_then(|p| parse_priority(p))
                    .unwrap_or(JobPriority::High),
                zone_id: params.get("zone").cloned(),
                duration_hours: duration,
                remaining_hours: duration,
                repeatable: false,
            });
            Ok(format!("scheduled {}", job_id))
        }
        "set_alert_level" => {
            let Some(level) = params.get("level").and_then(|l| parse_alert_level(l)) else {
                return Ok("skipped: missing or unknown level".to_string());
            };
            cx.world.base_state.alert_level = level;
            Ok(format!("alert={:?}", level))
        }
        "spawn_event" => {
            let location = params
                .get("target")
                .cloned()
                .unwrap_or_else(|| cx.world.base_state.site_tile_id.clone());
            cx.world.events.push(EventRecord {
                id: format!(
                    "event_{}_{:06}_{:02}",
                    incident.card_id, incident.tick, index
                ),
                timestamp: incident.tick as i64,
                event_type: EventType::Catastrophe,
                actors: Vec::new(),
                location_id: location.clone(),
                details: params.clone(),
            });
            Ok(format!("spawned event at {}", location))
        }
        other => Err(SimError::UnsupportedVariant(format!(
            "effect type '{}'",
            other
        ))),
    }
}

fn param_f32(params: &BTreeMap<String, String>, key: &str) -> Option<f32> {
    params.get(key).and_then(|value| value.parse().ok())
}

fn param_i64(params: &BTreeMap<String, String>, key: &str) -> Option<i64> {
    params.get(key).and_then(|value| value.parse().ok())
}

fn parse_job_type(value: &str) -> Option<JobType> {
    match value {
        "maintenance" => Some(JobType::Maintenance),
        "production" => Some(JobType::Production),
        "research" => Some(JobType::Research),
        "patrol" => Some(JobType::Patrol),
        _ => None,
    }
}

fn parse_priority(value: &str) -> Option<JobPriority> {
    match value {
        "low" => Some(JobPriority::Low),
        "normal" => Some(JobPriority::Normal),
        "high" => Some(JobPriority::High),
        "critical" => Some(JobPriority::Critical),
        _ => None,
    }
}

fn parse_alert_level(value: &str) -> Option<AlertLevel> {
    match value {
        "calm" => Some(AlertLevel::Calm),
        "elevated" => Some(AlertLevel::Elevated),
        "critical" => Some(AlertLevel::Critical),
        _ => None,
    }
}
