//! Simulation clock management.
//!
//! The clock is a logical time value advanced only by event selection. It
//! never moves backward: an attempt to do so is a kernel defect and is
//! reported as [`SimError::ClockRegression`].

use serde::{Deserialize, Serialize};

use crate::engine::SimTime;
use crate::error::{SimError, SimResult};

/// Simulation clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimClock {
    /// Current simulation time.
    current: SimTime,
    /// Number of event times the clock has been advanced to.
    step_count: u64,
}

impl SimClock {
    /// Create a clock at time zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: SimTime::ZERO,
            step_count: 0,
        }
    }

    /// Get current simulation time.
    #[must_use]
    pub const fn current_time(&self) -> SimTime {
        self.current
    }

    /// Get number of steps taken.
    #[must_use]
    pub const fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Advance the clock to the time of the next event.
    ///
    /// Equal times are allowed (simultaneous events).
    ///
    /// # Errors
    ///
    /// Returns `ClockRegression` if `time` is earlier than the current time
    /// or is not a number.
    pub fn advance_to(&mut self, time: SimTime) -> SimResult<SimTime> {
        if time.is_nan() || time < self.current {
            return Err(SimError::ClockRegression {
                from: self.current.as_f64(),
                to: time.as_f64(),
            });
        }

        self.current = time;
        self.step_count += 1;
        Ok(self.current)
    }

    /// Reset clock to initial state.
    pub fn reset(&mut self) {
        self.current = SimTime::ZERO;
        self.step_count = 0;
    }

    /// Time remaining until `target` (zero if it already passed).
    #[must_use]
    pub fn time_until(&self, target: SimTime) -> f64 {
        (target - self.current).max(0.0)
    }
}
