//! Simulation configuration with documented constants
//!
//! All tuning values are collected here with explanations of their purpose
//! and how they interact with each other.

use crate::core::error::{SimError, SimResult};

/// Configuration for the simulation substrate
///
/// These values have been tuned to produce good pacing in base mode.
/// Changing them shifts how often raids, mandates and incidents land.
#[derive(Debug, Clone)]
pub struct SimConfig {
    // === TIME ===
    /// Base-mode ticks per in-game day
    ///
    /// Mandates resolve once per day, and a scheduled raid lands after
    /// max(4, hours_per_day / 3) ticks. At 24, a raid gives the player
    /// roughly a third of a day of warning.
    pub hours_per_day: u64,

    /// Overworld ticks per in-game year
    ///
    /// Used only for clock conversions between the two modes.
    pub ticks_per_year: u64,

    // === COMMAND INGESTION ===
    /// Bounded history kept by the indirect command dispatcher
    ///
    /// Oldest commands are evicted past this limit. 32 covers a few
    /// minutes of UI interaction without unbounded growth.
    pub command_history_limit: usize,

    // === ORACLE ===
    /// Ticks an event card stays on cooldown after being drawn
    ///
    /// At 6 ticks against 24-hour days, a card can fire at most four
    /// times per day even under constant raid pressure.
    pub incident_cooldown: i64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            hours_per_day: 24,
            ticks_per_year: 1,
            command_history_limit: 32,
            incident_cooldown: 6,
        }
    }
}

impl SimConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> SimResult<()> {
        if self.hours_per_day == 0 {
            return Err(SimError::InvalidArgument(
                "hours_per_day must be positive".to_string(),
            ));
        }
        if self.ticks_per_year == 0 {
            return Err(SimError::InvalidArgument(
                "ticks_per_year must be positive".to_string(),
            ));
        }
        if self.command_history_limit == 0 {
            return Err(SimError::InvalidArgument(
                "command_history_limit must be positive".to_string(),
            ));
        }
        if self.incident_cooldown <= 0 {
            return Err(SimError::InvalidArgument(
                "incident_cooldown must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
