//! Runtime-only state for the base-mode simulation
//!
//! Everything in here lives for one simulation session and is rebuilt
//! deterministically from the persistent [`BaseState`]: zone wear and
//! morale, the job board, the raid threat machine and the mandate tracker
//! are never serialized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{SimError, SimResult};
use crate::world::data::{BaseState, WorldState, ZoneType};

/// Derived per-zone simulation state.
///
/// Reconstructed from the zone list at session start; the persistent part
/// of a zone (id/name/type/efficiency) stays in [`BaseState`].
#[derive(Debug, Clone)]
pub struct ZoneRuntime {
    pub morale_modifier: f32,
    pub wear: f32,
    pub workforce_allocation: f32,
}

impl Default for ZoneRuntime {
    fn default() -> Self {
        Self {
            morale_modifier: 0.5,
            wear: 0.1,
            workforce_allocation: 1.0,
        }
    }
}

/// A schedulable unit of base work.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub job_type: JobType,
    pub priority: JobPriority,
    pub zone_id: Option<String>,
    pub duration_hours: i64,
    pub remaining_hours: i64,
    pub repeatable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    Maintenance,
    Production,
    Research,
    Patrol,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Maintenance => "maintenance",
            JobType::Production => "production",
            JobType::Research => "research",
            JobType::Patrol => "patrol",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobPriority {
    Low = 0,
    Normal = 1,
    High = 2,
    Critical = 3,
}

/// Snapshot of a job at the moment it completed.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub id: String,
    pub job_type: JobType,
    pub zone_id: Option<String>,
    pub priority: JobPriority,
    pub duration_hours: i64,
}

/// Priority-ordered board of active jobs.
#[derive(Debug, Default)]
pub struct JobBoard {
    jobs: Vec<Job>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Seed the board from persistent state: one job per zone, a research
    /// job when a project is active, a patrol when anyone lives here.
    pub fn seed_from_base(&mut self, state: &BaseState) {
        self.jobs.clear();

        for zone in &state.zones {
            self.jobs.push(zone_job(zone.r#type, &zone.id));
        }

        if let Some(project_id) = &state.research.active_project_id {
            self.jobs.push(Job {
                id: format!("job_research_{}", project_id),
                job_type: JobType::Research,
                priority: JobPriority::High,
                zone_id: state
                    .zones
                    .iter()
                    .find(|z| z.r#type == ZoneType::ResearchLab)
                    .map(|z| z.id.clone()),
                duration_hours: 6,
                remaining_hours: 6,
                repeatable: true,
            });
        }

        if !state.population.is_empty() {
            self.jobs.push(Job {
                id: "job_patrol_default".to_string(),
                job_type: JobType::Patrol,
                priority: JobPriority::Normal,
                zone_id: state
                    .zones
                    .iter()
                    .find(|z| z.r#type == ZoneType::Watchtower)
                    .map(|z| z.id.clone()),
                duration_hours: 8,
                remaining_hours: 8,
                repeatable: true,
            });
        }
    }

    /// Add a job unless its id is already on the board.
    pub fn enqueue(&mut self, mut job: Job) {
        if self.jobs.iter().any(|existing| existing.id == job.id) {
            return;
        }
        job.remaining_hours = job.duration_hours;
        self.jobs.push(job);
    }

    /// Advance the board by one tick.
    ///
    /// Jobs are processed in priority-descending order, ties broken by id
    /// ascending (ordinal), up to `workforce` jobs. Completed jobs are
    /// pushed to `completed` and either reset (repeatable) or removed.
    pub fn advance(&mut self, workforce: usize, completed: &mut Vec<JobOutcome>) {
        if self.jobs.is_empty() {
            return;
        }

        let mut order: Vec<usize> = (0..self.jobs.len()).collect();
        order.sort_by(|&a, &b| {
            let ja = &self.jobs[a];
            let jb = &self.jobs[b];
            jb.priority.cmp(&ja.priority).then_with(|| ja.id.cmp(&jb.id))
        });

        let mut finished_ids = Vec::new();
        for &index in order.iter().take(workforce) {
            let job = &mut self.jobs[index];
            job.remaining_hours -= 1;
            if job.remaining_hours > 0 {
                continue;
            }

            completed.push(JobOutcome {
                id: job.id.clone(),
                job_type: job.job_type,
                zone_id: job.zone_id.clone(),
                priority: job.priority,
                duration_hours: job.duration_hours,
            });

            if job.repeatable {
                job.remaining_hours = job.duration_hours;
            } else {
                finished_ids.push(job.id.clone());
            }
        }

        if !finished_ids.is_empty() {
            self.jobs.retain(|job| !finished_ids.contains(&job.id));
        }
    }
}

fn zone_job(zone_type: ZoneType, zone_id: &str) -> Job {
    let priority = match zone_type {
        ZoneType::Watchtower | ZoneType::ResearchLab => JobPriority::High,
        ZoneType::Workshop | ZoneType::Farm => JobPriority::Normal,
        ZoneType::Habitat => JobPriority::Low,
    };

    let job_type = match zone_type {
        ZoneType::Habitat => JobType::Maintenance,
        ZoneType::Workshop | ZoneType::Farm => JobType::Production,
        ZoneType::Watchtower => JobType::Patrol,
        ZoneType::ResearchLab => JobType::Research,
    };

    let duration = match zone_type {
        ZoneType::Farm => 10,
        ZoneType::Workshop | ZoneType::Watchtower => 8,
        ZoneType::ResearchLab | ZoneType::Habitat => 6,
    };

    Job {
        id: format!("job_{}_{}", zone_id, job_type.as_str()),
        job_type,
        priority,
        zone_id: Some(zone_id.to_string()),
        duration_hours: duration,
        remaining_hours: duration,
        repeatable: true,
    }
}

/// Raid pressure state machine: Idle -> Scheduled -> resolves back to Idle.
#[derive(Debug, Clone)]
pub struct RaidThreatState {
    pub threat_meter: f32,
    pub raid_scheduled: bool,
    pub hours_until_raid: i64,
    pub attacking_faction_id: String,
}

impl Default for RaidThreatState {
    fn default() -> Self {
        Self {
            threat_meter: 0.3,
            raid_scheduled: false,
            hours_until_raid: 0,
            attacking_faction_id: String::new(),
        }
    }
}

/// A timed objective tied to job-type completions.
#[derive(Debug, Clone, PartialEq)]
pub struct Mandate {
    pub id: String,
    pub issuer_character_id: String,
    pub mandate_type: MandateType,
    pub status: MandateStatus,
    pub target_job_type: JobType,
    pub required_completions: u32,
    pub completed_count: u32,
    pub days_remaining: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MandateType {
    Infrastructure,
    Production,
    Defense,
    Research,
}

impl MandateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MandateType::Infrastructure => "infrastructure",
            MandateType::Production => "production",
            MandateType::Defense => "defense",
            MandateType::Research => "research",
        }
    }
}

/// Completed and Failed are terminal; a mandate is never resurrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MandateStatus {
    Active,
    Completed,
    Failed,
}

impl MandateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MandateStatus::Active => "Active",
            MandateStatus::Completed => "Completed",
            MandateStatus::Failed => "Failed",
        }
    }
}

/// A mandate outcome produced by one daily resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MandateResolution {
    pub mandate: Mandate,
    pub result: MandateStatus,
}

/// Tracks mandates and resolves them once per in-game day.
#[derive(Debug)]
pub struct MandateTracker {
    mandates: Vec<Mandate>,
    hours_per_day: u64,
    hour_accumulator: u64,
}

impl MandateTracker {
    pub fn new(hours_per_day: u64) -> SimResult<Self> {
        if hours_per_day == 0 {
            return Err(SimError::InvalidArgument(
                "hours_per_day must be positive".to_string(),
            ));
        }
        Ok(Self {
            mandates: Vec::new(),
            hours_per_day,
            hour_accumulator: 0,
        })
    }

    pub fn mandates(&self) -> &[Mandate] {
        &self.mandates
    }

    /// Seed the initial mandate set from the world and base layout.
    pub fn initialize(&mut self, world: &WorldState, state: &BaseState) {
        self.mandates.clear();

        let issuer = world
            .characters
            .first()
            .map(|c| c.id.clone())
            .unwrap_or_default();
        let has_workshop = state.zones.iter().any(|z| z.r#type == ZoneType::Workshop);
        let has_research = state
            .zones
            .iter()
            .any(|z| z.r#type == ZoneType::ResearchLab);

        self.mandates.push(Mandate {
            id: "mandate_secure_water".to_string(),
            issuer_character_id: issuer.clone(),
            mandate_type: MandateType::Infrastructure,
            status: MandateStatus::Active,
            target_job_type: JobType::Maintenance,
            required_completions: 2,
            completed_count: 0,
            days_remaining: 4,
        });

        if has_workshop {
            self.mandates.push(Mandate {
                id: "mandate_stockpile_supplies".to_string(),
                issuer_character_id: issuer.clone(),
                mandate_type: MandateType::Production,
                status: MandateStatus::Active,
                target_job_type: JobType::Production,
                required_completions: 3,
                completed_count: 0,
                days_remaining: 5,
            });
        }

        if has_research {
            self.mandates.push(Mandate {
                id: "mandate_finish_research".to_string(),
                issuer_character_id: issuer,
                mandate_type: MandateType::Research,
                status: MandateStatus::Active,
                target_job_type: JobType::Research,
                required_completions: 2,
                completed_count: 0,
                days_remaining: 6,
            });
        }
    }

    /// Advance the hour accumulator; on a day boundary, resolve mandates
    /// against the jobs completed this tick.
    pub fn advance(&mut self, completed_jobs: &[JobOutcome]) -> Vec<MandateResolution> {
        if self.mandates.is_empty() {
            return Vec::new();
        }

        self.hour_accumulator += 1;
        if self.hour_accumulator < self.hours_per_day {
            return Vec::new();
        }
        self.hour_accumulator = 0;

        let mut resolutions = Vec::new();
        for mandate in &mut self.mandates {
            if mandate.status != MandateStatus::Active {
                continue;
            }

            let progress = completed_jobs
                .iter()
                .filter(|job| job.job_type == mandate.target_job_type)
                .count() as u32;
            if progress > 0 {
                mandate.completed_count += progress;
                if mandate.completed_count >= mandate.required_completions {
                    mandate.status = MandateStatus::Completed;
                    resolutions.push(MandateResolution {
                        mandate: mandate.clone(),
                        result: MandateStatus::Completed,
                    });
                    continue;
                }
            }

            mandate.days_remaining -= 1;
            if mandate.days_remaining < 0 {
                mandate.status = MandateStatus::Failed;
                resolutions.push(MandateResolution {
                    mandate: mandate.clone(),
                    result: MandateStatus::Failed,
                });
            }
        }

        resolutions
    }

    /// Chain a fresh mandate after a completion. Failed mandates get none.
    pub fn enqueue_follow_up(&mut self, source: &Mandate, tick: u64) {
        self.mandates.push(Mandate {
            id: format!(
                "mandate_followup_{:06}_{}",
                tick,
                source.mandate_type.as_str()
            ),
            issuer_character_id: source.issuer_character_id.clone(),
            mandate_type: source.mandate_type,
            status: MandateStatus::Active,
            target_job_type: source.target_job_type,
            required_completions: source.required_completions.max(1),
            completed_count: 0,
            days_remaining: (source.days_remaining + 3).max(3),
        });
    }
}

/// Session-scoped runtime bundle for one base.
pub struct BaseRuntime {
    hours_per_day: u64,
    /// Ticks a drawn oracle card stays unavailable.
    pub incident_cooldown: i64,
    pub zones: BTreeMap<String, ZoneRuntime>,
    pub job_board: JobBoard,
    pub raid_threat: RaidThreatState,
    pub mandate_tracker: MandateTracker,
    pub recently_completed_jobs: Vec<JobOutcome>,
}

impl BaseRuntime {
    /// Rebuild runtime state from persistent base state.
    pub fn new(state: &BaseState, hours_per_day: u64) -> SimResult<Self> {
        if hours_per_day == 0 {
            return Err(SimError::InvalidArgument(
                "hours_per_day must be positive".to_string(),
            ));
        }

        let zones = state
            .zones
            .iter()
            .map(|zone| (zone.id.clone(), ZoneRuntime::default()))
            .collect();

        Ok(Self {
            hours_per_day,
            incident_cooldown: 6,
            zones,
            job_board: JobBoard::new(),
            raid_threat: RaidThreatState::default(),
            mandate_tracker: MandateTracker::new(hours_per_day)?,
            recently_completed_jobs: Vec::new(),
        })
    }

    pub fn hours_per_day(&self) -> u64 {
        self.hours_per_day
    }

    pub fn seed_initial_jobs(&mut self, state: &BaseState) {
        self.job_board.seed_from_base(state);
    }

    pub fn seed_initial_mandates(&mut self, world: &WorldState, state: &BaseState) {
        self.mandate_tracker.initialize(world, state);
    }

    pub fn record_completed_jobs(&mut self, jobs: Vec<JobOutcome>) {
        self.recently_completed_jobs = jobs;
    }
}
