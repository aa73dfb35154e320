//! Time-weighted statistics.
//!
//! A state variable that only changes at event times is a step function of
//! simulated time. Its average over `[0, T]` is the area under the steps
//! divided by `T`. [`TimeAverageStats`] accumulates those areas, one per
//! bucket, by adding `|value| * elapsed` for every interval between events.

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::engine::SimTime;
use crate::error::{SimError, SimResult};

/// Area accumulator keyed by bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAverageStats<B: Ord> {
    /// Time of the previous update.
    last_event_time: SimTime,
    /// Cumulative area per bucket.
    areas: BTreeMap<B, f64>,
}

impl<B: Ord> Default for TimeAverageStats<B> {
    fn default() -> Self {
        Self {
            last_event_time: SimTime::ZERO,
            areas: BTreeMap::new(),
        }
    }
}

impl<B: Copy + Ord + Debug> TimeAverageStats<B> {
    /// Create an accumulator with no buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an accumulator whose buckets start at zero area.
    #[must_use]
    pub fn with_buckets(buckets: impl IntoIterator<Item = B>) -> Self {
        Self {
            last_event_time: SimTime::ZERO,
            areas: buckets.into_iter().map(|b| (b, 0.0)).collect(),
        }
    }

    /// Time of the previous update.
    #[must_use]
    pub const fn last_event_time(&self) -> SimTime {
        self.last_event_time
    }

    /// Add `|value| * (new_time - last_event_time)` to `bucket`.
    ///
    /// Returns the elapsed interval.
    ///
    /// # Errors
    ///
    /// Returns `ClockRegression` if `new_time` precedes the previous update.
    pub fn advance(&mut self, new_time: SimTime, value: f64, bucket: B) -> SimResult<f64> {
        self.advance_with(new_time, |interval| interval.add(bucket, value))
    }

    /// Close the interval ending at `new_time`, letting `record` add the value
    /// of every tracked quantity to it.
    ///
    /// The elapsed time is computed once and `last_event_time` moves to
    /// `new_time` afterwards, whatever `record` adds.
    ///
    /// # Errors
    ///
    /// Returns `ClockRegression` if `new_time` precedes the previous update.
    pub fn advance_with<F>(&mut self, new_time: SimTime, record: F) -> SimResult<f64>
    where
        F: FnOnce(&mut Interval<'_, B>),
    {
        let elapsed = new_time - self.last_event_time;
        if elapsed.is_nan() || elapsed < 0.0 {
            return Err(SimError::ClockRegression {
                from: self.last_event_time.as_f64(),
                to: new_time.as_f64(),
            });
        }

        let mut interval = Interval {
            elapsed,
            areas: &mut self.areas,
        };
        record(&mut interval);

        self.last_event_time = new_time;
        Ok(elapsed)
    }

    /// Cumulative area of `bucket`.
    #[must_use]
    pub fn area(&self, bucket: B) -> f64 {
        self.areas.get(&bucket).copied().unwrap_or(0.0)
    }

    /// All cumulative areas.
    #[must_use]
    pub const fn areas(&self) -> &BTreeMap<B, f64> {
        &self.areas
    }

    /// Time-weighted average of `bucket` over `[0, horizon]`.
    ///
    /// Zero for a non-positive horizon.
    #[must_use]
    pub fn time_average(&self, bucket: B, horizon: f64) -> f64 {
        if horizon > 0.0 {
            self.area(bucket) / horizon
        } else {
            0.0
        }
    }

    /// Zero all areas and rewind to time zero.
    pub fn reset(&mut self) {
        self.last_event_time = SimTime::ZERO;
        for area in self.areas.values_mut() {
            *area = 0.0;
        }
    }
}

/// One elapsed interval between consecutive events.
#[derive(Debug)]
pub struct Interval<'a, B> {
    elapsed: f64,
    areas: &'a mut BTreeMap<B, f64>,
}

impl<B: Copy + Ord> Interval<'_, B> {
    /// Length of the interval.
    #[must_use]
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Add `|value| * elapsed` to `bucket`. Zero values leave areas untouched.
    pub fn add(&mut self, bucket: B, value: f64) {
        if value == 0.0 {
            return;
        }
        *self.areas.entry(bucket).or_insert(0.0) += value.abs() * self.elapsed;
    }
}
