//! Core simulation engine.
//!
//! Implements the next-event time-advance loop:
//! - Event list with one slot per registered event kind
//! - Simulation clock that only moves forward
//! - Time-weighted area accumulation between consecutive events
//! - Injectable variate generation
//!
//! One iteration of [`SimEngine::step`] selects the earliest scheduled kind,
//! advances the clock to it, integrates every tracked quantity over the
//! elapsed interval and then hands control to the model's handler.

pub mod clock;
pub mod rng;
pub mod scheduler;
pub mod stats;
pub mod variates;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::{debug, error, trace, warn};

pub use clock::SimClock;
pub use rng::{ScriptedUniforms, SimRng, VariateGenerator};
pub use scheduler::{EventList, ScheduledEvent};
pub use stats::{Interval, TimeAverageStats};
pub use variates::EmpiricalDistribution;

use crate::error::{SimError, SimResult};

/// Simulated time.
///
/// A plain `f64` reading of the logical clock. [`SimTime::INFINITY`] is the
/// "not scheduled" sentinel held by cancelled event slots.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
pub struct SimTime(f64);

impl SimTime {
    /// Zero time (simulation start).
    pub const ZERO: Self = Self(0.0);

    /// Sentinel for an event kind that is not scheduled.
    pub const INFINITY: Self = Self(f64::INFINITY);

    /// Create a time from a raw reading.
    #[must_use]
    pub const fn new(time: f64) -> Self {
        Self(time)
    }

    /// Raw reading.
    #[must_use]
    pub const fn as_f64(self) -> f64 {
        self.0
    }

    /// Whether this time can ever be selected by the event list.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// Whether this time is NaN.
    #[must_use]
    pub fn is_nan(self) -> bool {
        self.0.is_nan()
    }
}

impl std::ops::Add<f64> for SimTime {
    type Output = Self;

    fn add(self, delay: f64) -> Self::Output {
        Self(self.0 + delay)
    }
}

impl std::ops::Sub for SimTime {
    type Output = f64;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

impl From<f64> for SimTime {
    fn from(time: f64) -> Self {
        Self(time)
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_finite() {
            write!(f, "{:.6}", self.0)
        } else {
            write!(f, "inf")
        }
    }
}

/// A domain simulation driven by the kernel.
///
/// The model owns all domain state. The kernel reads it once per interval
/// through [`Model::record`] and mutates it only through [`Model::handle`].
pub trait Model {
    /// Event kind enumeration.
    type Kind: Copy + Eq + Debug;

    /// Category of time-weighted area.
    type Bucket: Copy + Ord + Debug;

    /// Register every event kind with its initial time.
    ///
    /// Registration order is the tie-break order of the event list.
    ///
    /// # Errors
    ///
    /// Returns error if an initial draw has invalid parameters.
    fn register_events(
        &mut self,
        events: &mut EventList<Self::Kind>,
        rng: &mut dyn VariateGenerator,
    ) -> SimResult<()>;

    /// Buckets reported even if nothing was ever added to them.
    fn buckets(&self) -> Vec<Self::Bucket> {
        Vec::new()
    }

    /// Add the current value of every tracked quantity to the interval.
    ///
    /// Called exactly once per event, before the handler runs, so the values
    /// read are the ones that held during the elapsed interval.
    fn record(&self, interval: &mut Interval<'_, Self::Bucket>);

    /// State transition for one event.
    ///
    /// # Errors
    ///
    /// Any error aborts the run.
    fn handle(
        &mut self,
        kind: Self::Kind,
        ctx: &mut EventContext<'_, Self::Kind>,
    ) -> SimResult<()>;

    /// Termination predicate, evaluated after each handled event.
    fn should_stop(&self) -> bool;
}

/// Kernel services available to an event handler.
pub struct EventContext<'a, K> {
    now: SimTime,
    kind: K,
    events: &'a mut EventList<K>,
    rng: &'a mut dyn VariateGenerator,
}

impl<'a, K: Copy + Eq + Debug> EventContext<'a, K> {
    /// Current simulated time.
    #[must_use]
    pub const fn now(&self) -> SimTime {
        self.now
    }

    /// The event kind being handled.
    #[must_use]
    pub const fn kind(&self) -> K {
        self.kind
    }

    /// Schedule `kind` at an absolute time.
    ///
    /// # Errors
    ///
    /// Returns error if the kind is unregistered or the time is NaN.
    pub fn schedule(&mut self, kind: K, time: SimTime) -> SimResult<()> {
        self.events.schedule(kind, time)
    }

    /// Schedule `kind` at `now + delay`.
    ///
    /// # Errors
    ///
    /// Returns error if the kind is unregistered or the time is NaN.
    pub fn schedule_in(&mut self, kind: K, delay: f64) -> SimResult<()> {
        self.events.schedule(kind, self.now + delay)
    }

    /// Remove `kind` from consideration.
    ///
    /// # Errors
    ///
    /// Returns error if the kind is unregistered.
    pub fn cancel(&mut self, kind: K) -> SimResult<()> {
        self.events.cancel(kind)
    }

    /// Next scheduled time of `kind`, if it is scheduled.
    #[must_use]
    pub fn next_time(&self, kind: K) -> Option<SimTime> {
        self.events.next_time(kind)
    }

    /// The run's variate generator.
    pub fn rng(&mut self) -> &mut (dyn VariateGenerator + 'a) {
        &mut *self.rng
    }

    /// Build a handler error tagged with the current time and kind.
    #[must_use]
    pub fn handler_error(&self, message: impl Into<String>) -> SimError {
        SimError::Handler {
            time: self.now.as_f64(),
            kind: format!("{:?}", self.kind),
            message: message.into(),
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The model's termination predicate held.
    Normal,
    /// No event kind was scheduled.
    EventListEmpty {
        /// Simulated time of the failure.
        time: f64,
    },
    /// A handler returned an error.
    HandlerFailed {
        /// Simulated time of the failing event.
        time: f64,
        /// Debug rendering of the failing event kind.
        kind: String,
        /// Rendered error.
        message: String,
    },
    /// The clock or accumulator detected a broken invariant.
    InvariantViolated {
        /// Rendered error.
        message: String,
    },
}

/// Kernel state machine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RunStatus {
    /// Events may still be processed.
    #[default]
    Running,
    /// The run is over.
    Terminated(TerminationReason),
}

impl RunStatus {
    /// Check whether the engine can still step.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Result of one processed event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome<K> {
    /// Kind that was dispatched.
    pub kind: K,
    /// Time the clock advanced to.
    pub time: SimTime,
    /// Whether the termination predicate now holds.
    pub terminated: bool,
}

/// Final statistics of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary<B: Ord> {
    /// Simulated time of the last processed event.
    pub end_time: f64,
    /// Number of events dispatched.
    pub events_processed: u64,
    /// Cumulative area per bucket.
    pub areas: BTreeMap<B, f64>,
    /// Why the run stopped; `None` for a snapshot of a running engine.
    pub reason: Option<TerminationReason>,
}

impl<B: Copy + Ord> RunSummary<B> {
    /// Cumulative area of a bucket (zero if never touched).
    #[must_use]
    pub fn area(&self, bucket: B) -> f64 {
        self.areas.get(&bucket).copied().unwrap_or(0.0)
    }

    /// Time-weighted average of a bucket over `[0, end_time]`.
    #[must_use]
    pub fn time_average(&self, bucket: B) -> f64 {
        if self.end_time > 0.0 {
            self.area(bucket) / self.end_time
        } else {
            0.0
        }
    }
}

/// Main simulation engine.
///
/// Owns the clock, event list, accumulator and variate generator of one run.
/// Independent runs use independent engines.
pub struct SimEngine<M: Model, R: VariateGenerator = SimRng> {
    model: M,
    events: EventList<M::Kind>,
    stats: TimeAverageStats<M::Bucket>,
    clock: SimClock,
    rng: R,
    status: RunStatus,
}

impl<M: Model, R: VariateGenerator> SimEngine<M, R> {
    /// Create an engine and let the model register its events.
    ///
    /// # Errors
    ///
    /// Returns error if event registration fails.
    pub fn new(mut model: M, mut rng: R) -> SimResult<Self> {
        let mut events = EventList::new();
        model.register_events(&mut events, &mut rng)?;
        let stats = TimeAverageStats::with_buckets(model.buckets());
        debug!(kinds = events.len(), "simulation initialized");

        Ok(Self {
            model,
            events,
            stats,
            clock: SimClock::new(),
            rng,
            status: RunStatus::Running,
        })
    }

    /// Current simulated time.
    #[must_use]
    pub const fn current_time(&self) -> SimTime {
        self.clock.current_time()
    }

    /// Simulation clock.
    #[must_use]
    pub const fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Event list.
    #[must_use]
    pub const fn events(&self) -> &EventList<M::Kind> {
        &self.events
    }

    /// Mutable event list, for scheduling from outside a handler.
    pub fn events_mut(&mut self) -> &mut EventList<M::Kind> {
        &mut self.events
    }

    /// Time-average accumulator.
    #[must_use]
    pub const fn stats(&self) -> &TimeAverageStats<M::Bucket> {
        &self.stats
    }

    /// Domain model.
    #[must_use]
    pub const fn model(&self) -> &M {
        &self.model
    }

    /// Mutable domain model.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Variate generator.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// State of the run.
    #[must_use]
    pub const fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Consume the engine, returning the model.
    pub fn into_model(self) -> M {
        self.model
    }

    /// Process the next event.
    ///
    /// # Errors
    ///
    /// Returns `SimError` if:
    /// - The engine already terminated
    /// - No event is scheduled (`EventListEmpty`)
    /// - The selected time lies in the past (`ClockRegression`)
    /// - The handler fails; errors without their own context come back as
    ///   `EventFailed` carrying the event's time and kind
    pub fn step(&mut self) -> SimResult<StepOutcome<M::Kind>> {
        if !self.status.is_running() {
            return Err(SimError::AlreadyTerminated);
        }

        let now = self.clock.current_time();
        let Some(next) = self.events.select_next() else {
            warn!(time = now.as_f64(), "event list empty");
            self.status = RunStatus::Terminated(TerminationReason::EventListEmpty {
                time: now.as_f64(),
            });
            return Err(SimError::EventListEmpty { time: now.as_f64() });
        };

        if let Err(err) = self.advance(next.time) {
            error!(error = %err, "kernel invariant violated");
            self.status = RunStatus::Terminated(TerminationReason::InvariantViolated {
                message: err.to_string(),
            });
            return Err(err);
        }

        trace!(time = next.time.as_f64(), kind = ?next.kind, "dispatching event");
        let mut ctx = EventContext {
            now: next.time,
            kind: next.kind,
            events: &mut self.events,
            rng: &mut self.rng,
        };
        if let Err(err) = self.model.handle(next.kind, &mut ctx) {
            let kind = format!("{:?}", next.kind);
            let err = err.in_event(next.time.as_f64(), kind.clone());
            error!(time = next.time.as_f64(), kind = %kind, error = %err, "handler failed");
            self.status = RunStatus::Terminated(TerminationReason::HandlerFailed {
                time: next.time.as_f64(),
                kind,
                message: err.to_string(),
            });
            return Err(err);
        }

        let terminated = self.model.should_stop();
        if terminated {
            debug!(
                time = next.time.as_f64(),
                events = self.clock.step_count(),
                "termination predicate satisfied"
            );
            self.status = RunStatus::Terminated(TerminationReason::Normal);
        }

        Ok(StepOutcome {
            kind: next.kind,
            time: next.time,
            terminated,
        })
    }

    /// Run until the termination predicate holds.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`SimEngine::step`]; no partial
    /// summary is produced.
    pub fn run(&mut self) -> SimResult<RunSummary<M::Bucket>> {
        if self.status.is_running() && self.model.should_stop() {
            self.status = RunStatus::Terminated(TerminationReason::Normal);
        }

        while self.status.is_running() {
            self.step()?;
        }

        Ok(self.summary())
    }

    /// Snapshot of the statistics gathered so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary<M::Bucket> {
        let reason = match &self.status {
            RunStatus::Running => None,
            RunStatus::Terminated(reason) => Some(reason.clone()),
        };

        RunSummary {
            end_time: self.clock.current_time().as_f64(),
            events_processed: self.clock.step_count(),
            areas: self.stats.areas().clone(),
            reason,
        }
    }

    fn advance(&mut self, time: SimTime) -> SimResult<()> {
        self.clock.advance_to(time)?;
        let model = &self.model;
        self.stats.advance_with(time, |interval| model.record(interval))?;
        Ok(())
    }
}

impl<M: Model + Debug, R: VariateGenerator> Debug for SimEngine<M, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimEngine")
            .field("model", &self.model)
            .field("events", &self.events)
            .field("stats", &self.stats)
            .field("clock", &self.clock)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
