//! Event list with one slot per event kind.
//!
//! Each registered kind holds the time of its next occurrence, or
//! [`SimTime::INFINITY`] when it is not scheduled. Selection scans the slots
//! in registration order and keeps the first strictly smaller time, so two
//! kinds scheduled for the same instant resolve to the one registered first.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::engine::SimTime;
use crate::error::{SimError, SimResult};

/// An event kind together with its next occurrence time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent<K> {
    /// Event kind.
    pub kind: K,
    /// Next occurrence (`INFINITY` when not scheduled).
    pub time: SimTime,
}

impl<K> ScheduledEvent<K> {
    /// Create a new slot.
    #[must_use]
    pub const fn new(kind: K, time: SimTime) -> Self {
        Self { kind, time }
    }
}

/// Sparse mapping from event kind to next occurrence time.
///
/// # Example
///
/// ```rust
/// use evsim::engine::scheduler::EventList;
/// use evsim::engine::SimTime;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum Kind { Arrival, Departure }
///
/// let mut events = EventList::new();
/// events.register(Kind::Arrival, SimTime::new(5.0)).unwrap();
/// events.register(Kind::Departure, SimTime::new(3.0)).unwrap();
///
/// let next = events.select_next().unwrap();
/// assert_eq!(next.kind, Kind::Departure);
/// ```
#[derive(Debug, Clone)]
pub struct EventList<K> {
    /// Slots in registration order.
    slots: Vec<ScheduledEvent<K>>,
}

impl<K> Default for EventList<K> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<K: Copy + Eq + Debug> EventList<K> {
    /// Create an empty event list.
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Create an event list sized for `kinds` registrations.
    #[must_use]
    pub fn with_capacity(kinds: usize) -> Self {
        Self {
            slots: Vec::with_capacity(kinds),
        }
    }

    /// Register a kind with its initial time.
    ///
    /// Pass [`SimTime::INFINITY`] to register a kind that is not yet scheduled.
    ///
    /// # Errors
    ///
    /// Returns error if the kind is already registered or the time is NaN.
    pub fn register(&mut self, kind: K, time: SimTime) -> SimResult<()> {
        if self.position(kind).is_some() {
            return Err(SimError::config(format!(
                "event kind {kind:?} registered twice"
            )));
        }
        if time.is_nan() {
            return Err(SimError::NonFiniteTime {
                kind: format!("{kind:?}"),
            });
        }

        self.slots.push(ScheduledEvent::new(kind, time));
        Ok(())
    }

    /// Set the next occurrence of `kind`.
    ///
    /// The list does not check `time` against the clock; scheduling into the
    /// past surfaces later as a clock regression.
    ///
    /// # Errors
    ///
    /// Returns error if the kind is unregistered or the time is NaN.
    pub fn schedule(&mut self, kind: K, time: SimTime) -> SimResult<()> {
        if time.is_nan() {
            return Err(SimError::NonFiniteTime {
                kind: format!("{kind:?}"),
            });
        }

        let index = self.position(kind).ok_or_else(|| SimError::UnknownEventKind {
            kind: format!("{kind:?}"),
        })?;
        trace!(kind = ?kind, time = time.as_f64(), "scheduled");
        self.slots[index].time = time;
        Ok(())
    }

    /// Remove `kind` from consideration.
    ///
    /// # Errors
    ///
    /// Returns error if the kind is unregistered.
    pub fn cancel(&mut self, kind: K) -> SimResult<()> {
        self.schedule(kind, SimTime::INFINITY)
    }

    /// Cancel every registered kind.
    pub fn cancel_all(&mut self) {
        for slot in &mut self.slots {
            slot.time = SimTime::INFINITY;
        }
    }

    /// The kind with the strictly smallest finite time.
    ///
    /// Returns `None` when nothing is scheduled. The slot is left in place;
    /// the handler of the selected kind reschedules or cancels it.
    #[must_use]
    pub fn select_next(&self) -> Option<ScheduledEvent<K>> {
        let mut best: Option<ScheduledEvent<K>> = None;

        for slot in &self.slots {
            if !slot.time.is_finite() {
                continue;
            }
            match best {
                Some(current) if slot.time >= current.time => {}
                _ => best = Some(*slot),
            }
        }

        best
    }

    /// Next scheduled time of `kind`, or `None` if unregistered or cancelled.
    #[must_use]
    pub fn next_time(&self, kind: K) -> Option<SimTime> {
        self.position(kind)
            .map(|i| self.slots[i].time)
            .filter(|t| t.is_finite())
    }

    /// Check whether `kind` has a finite next time.
    #[must_use]
    pub fn is_scheduled(&self, kind: K) -> bool {
        self.next_time(kind).is_some()
    }

    /// Check whether `kind` has been registered.
    #[must_use]
    pub fn is_registered(&self, kind: K) -> bool {
        self.position(kind).is_some()
    }

    /// Number of kinds with a finite next time.
    #[must_use]
    pub fn scheduled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.time.is_finite()).count()
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no kind is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledEvent<K>> {
        self.slots.iter()
    }

    fn position(&self, kind: K) -> Option<usize> {
        self.slots.iter().position(|s| s.kind == kind)
    }
}
