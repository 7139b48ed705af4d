//! Logical simulation clock
//!
//! Ticks are the only notion of time in the simulation. The clock never
//! consults the wall clock; it is advanced exclusively by the scheduler and
//! converts between base-mode daily ticks and overworld years.

use crate::core::error::{SimError, SimResult};

/// Deterministic tick counter with day/year conversions.
#[derive(Debug, Clone)]
pub struct SimClock {
    ticks_per_year: u64,
    ticks_per_day: u64,
    current_tick: u64,
}

impl SimClock {
    /// Create a clock. Both ratios must be positive.
    pub fn new(ticks_per_year: u64, ticks_per_day: u64) -> SimResult<Self> {
        if ticks_per_year == 0 {
            return Err(SimError::InvalidArgument(
                "ticks_per_year must be positive".to_string(),
            ));
        }
        if ticks_per_day == 0 {
            return Err(SimError::InvalidArgument(
                "ticks_per_day must be positive".to_string(),
            ));
        }
        Ok(Self {
            ticks_per_year,
            ticks_per_day,
            current_tick: 0,
        })
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn ticks_per_day(&self) -> u64 {
        self.ticks_per_day
    }

    /// Advance the counter by `ticks`.
    pub fn advance_ticks(&mut self, ticks: u64) {
        self.current_tick = self.current_tick.saturating_add(ticks);
    }

    /// Reset the counter to an absolute value.
    pub fn set_tick(&mut self, tick: u64) {
        self.current_tick = tick;
    }

    /// Convert overworld years into base-mode daily ticks.
    pub fn years_to_ticks(&self, years: u64) -> u64 {
        years * self.ticks_per_year * self.ticks_per_day
    }

    /// Convert base-mode daily ticks into whole overworld years.
    pub fn ticks_to_years(&self, ticks: u64) -> u64 {
        ticks / (self.ticks_per_year * self.ticks_per_day)
    }
}
