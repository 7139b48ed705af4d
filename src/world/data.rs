//! World snapshot data model
//!
//! The root snapshot and every value type it carries. All ids are strings
//! compared ordinally, and every string-keyed map is a `BTreeMap` so key
//! order is canonical by construction. Collections that serialize as arrays
//! are put into canonical order by [`normalize`](crate::world::normalize).
//!
//! The simulation substrate never retains its own copy of a snapshot: it
//! mutates the one borrowed into `advance`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current snapshot document version.
pub const CURRENT_VERSION: u32 = 1;

fn current_version() -> u32 {
    CURRENT_VERSION
}

fn default_card_weight() -> f32 {
    1.0
}

/// Root snapshot for deterministic world state persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldState {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub apocalypse: ApocalypseMeta,
    #[serde(default)]
    pub tiles: Vec<Tile>,
    #[serde(default)]
    pub factions: Vec<Faction>,
    #[serde(default)]
    pub settlements: Vec<Settlement>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub events: Vec<EventRecord>,
    #[serde(default)]
    pub oracle_state: OracleState,
    #[serde(default)]
    pub legends: Vec<LegendEntry>,
    #[serde(default)]
    pub base_state: BaseState,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            seed: 0,
            apocalypse: ApocalypseMeta::default(),
            tiles: Vec::new(),
            factions: Vec::new(),
            settlements: Vec::new(),
            characters: Vec::new(),
            events: Vec::new(),
            oracle_state: OracleState::default(),
            legends: Vec::new(),
            base_state: BaseState::default(),
        }
    }
}

/// Integer grid coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Int2 {
    pub x: i32,
    pub y: i32,
}

impl Int2 {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: String,
    #[serde(default)]
    pub position: Int2,
    #[serde(default)]
    pub height: f32,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub moisture: f32,
    #[serde(default)]
    pub biome_id: String,
    #[serde(default)]
    pub hazard_tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faction {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub archetype: FactionArchetype,
    #[serde(default)]
    pub ethos_profile: EthosProfile,
    #[serde(default)]
    pub relations: Vec<RelationRecord>,
    #[serde(default)]
    pub noble_roster: Vec<NobleRoleAssignment>,
    #[serde(default)]
    pub holdings: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactionArchetype {
    #[default]
    Nomads,
    Technocracy,
    Zealots,
    Mercantile,
    Raiders,
    Guardians,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthosProfile {
    pub compassion: f32,
    pub ruthlessness: f32,
    pub tradition: f32,
    pub innovation: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationRecord {
    pub target_faction_id: String,
    #[serde(default)]
    pub standing: f32,
    #[serde(default)]
    pub state: RelationState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationState {
    Allied,
    #[default]
    Neutral,
    Hostile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NobleRoleAssignment {
    pub character_id: String,
    pub role: NobleRole,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum NobleRole {
    Overseer,
    Warlord,
    Quartermaster,
    ResearchChief,
    Steward,
    DiplomaticEnvoy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub id: String,
    #[serde(default)]
    pub faction_id: String,
    #[serde(default)]
    pub tile_id: String,
    #[serde(default)]
    pub population: u32,
    #[serde(default)]
    pub economy: EconomyProfile,
    #[serde(default)]
    pub defense_rating: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomyProfile {
    pub production: f32,
    pub trade: f32,
    pub research: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub faction_id: String,
    #[serde(default)]
    pub traits: Vec<TraitId>,
    #[serde(default)]
    pub skills: BTreeMap<SkillId, SkillLevel>,
    #[serde(default)]
    pub relationships: Vec<RelationshipRecord>,
    #[serde(default)]
    pub current_role: Option<NobleRole>,
    #[serde(default)]
    pub status: CharacterStatus,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TraitId {
    Stoic,
    Visionary,
    Pragmatic,
    Zealous,
    Empathic,
    Ruthless,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SkillId {
    Tactics,
    Leadership,
    Charisma,
    Organization,
    Ethos,
    Industry,
    Research,
    Survival,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillLevel {
    pub level: u32,
    pub experience: f32,
    pub aptitude: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipRecord {
    pub target_id: String,
    pub r#type: RelationshipType,
    #[serde(default)]
    pub intensity: i32,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RelationshipType {
    Friendship,
    Rivalry,
    Mentorship,
    Kinship,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterStatus {
    #[default]
    Active,
    Missing,
    Dead,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub event_type: EventType,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub location_id: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Battle,
    #[default]
    Discovery,
    Mandate,
    Raid,
    Research,
    Catastrophe,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub id: String,
    #[serde(default)]
    pub event_ids: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleState {
    #[serde(default)]
    pub active_deck_id: String,
    #[serde(default)]
    pub tension_score: f32,
    #[serde(default)]
    pub cooldowns: BTreeMap<String, i64>,
    #[serde(default)]
    pub available_decks: Vec<EventDeck>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDeck {
    pub id: String,
    #[serde(default)]
    pub tier: OracleDeckTier,
    #[serde(default = "default_card_weight")]
    pub weight: f32,
    #[serde(default)]
    pub cards: Vec<EventCard>,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum OracleDeckTier {
    #[default]
    Minor,
    Major,
    Epic,
}

/// A drawable oracle card.
///
/// Effects are immutable templates: when a card is drawn its effect list is
/// deep-cloned before dispatch, so mutating a dispatched effect never
/// aliases the deck. `weight` is tracked and rebalanced by the incident
/// system but selection among cooldown-free cards is uniform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCard {
    pub id: String,
    #[serde(default = "default_card_weight")]
    pub weight: f32,
    #[serde(default)]
    pub effects: Vec<EventEffect>,
    #[serde(default)]
    pub narrative: String,
}

impl Default for EventCard {
    fn default() -> Self {
        Self {
            id: String::new(),
            weight: default_card_weight(),
            effects: Vec::new(),
            narrative: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEffect {
    pub effect_type: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApocalypseMeta {
    #[serde(default)]
    pub r#type: ApocalypseType,
    #[serde(default)]
    pub severity: f32,
    #[serde(default)]
    pub origin_tile_id: String,
    #[serde(default)]
    pub era_timeline: Vec<EraEvent>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApocalypseType {
    #[default]
    RadiantStorm,
    NanoPlague,
    ArcaneSundering,
    VoidBlight,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EraEvent {
    pub timestamp: i64,
    #[serde(default)]
    pub description: String,
}

/// Persistent base-mode state.
///
/// Infrastructure values are conceptually clamped to [0, 1.5]; writers clamp
/// rather than reject out-of-range values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseState {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub site_tile_id: String,
    #[serde(default)]
    pub zones: Vec<BaseZone>,
    #[serde(default)]
    pub population: Vec<String>,
    #[serde(default)]
    pub infrastructure: BTreeMap<String, f32>,
    #[serde(default)]
    pub alert_level: AlertLevel,
    #[serde(default)]
    pub inventory: Vec<ItemStack>,
    #[serde(default)]
    pub research: ResearchState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseZone {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub r#type: ZoneType,
    #[serde(default)]
    pub efficiency: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneType {
    #[default]
    Habitat,
    Workshop,
    Farm,
    Watchtower,
    ResearchLab,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AlertLevel {
    #[default]
    Calm,
    Elevated,
    Critical,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStack {
    pub item_id: String,
    #[serde(default)]
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchState {
    #[serde(default)]
    pub completed_projects: Vec<String>,
    #[serde(default)]
    pub active_project_id: Option<String>,
    #[serde(default)]
    pub active_progress: f32,
}
