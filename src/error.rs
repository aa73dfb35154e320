//! Error types for evsim.
//!
//! Every fallible operation returns `Result<T, SimError>`. A simulation run
//! has no recoverable errors: each variant aborts the run and carries the
//! simulated time or event kind needed to diagnose it.

use thiserror::Error;

/// Result type alias for evsim operations.
pub type SimResult<T> = Result<T, SimError>;

/// Unified error type for all evsim operations.
#[derive(Debug, Error)]
pub enum SimError {
    // ===== Kernel Errors =====
    /// No event kind holds a finite next-occurrence time.
    #[error("Event list empty at time {time}")]
    EventListEmpty {
        /// Simulated time at which the list ran dry.
        time: f64,
    },

    /// A step would move simulated time backward.
    #[error("Clock regression: cannot move from {from} back to {to}")]
    ClockRegression {
        /// Current clock reading.
        from: f64,
        /// Requested (earlier) time.
        to: f64,
    },

    /// An event kind was used that was never registered with the event list.
    #[error("Unknown event kind: {kind}")]
    UnknownEventKind {
        /// Debug rendering of the offending kind.
        kind: String,
    },

    /// A NaN time was passed to the event list.
    #[error("Non-finite time scheduled for event kind {kind}")]
    NonFiniteTime {
        /// Debug rendering of the kind being scheduled.
        kind: String,
    },

    /// The engine was stepped after it terminated.
    #[error("Simulation already terminated")]
    AlreadyTerminated,

    /// An event handler failed.
    #[error("Handler for {kind} failed at time {time}: {message}")]
    Handler {
        /// Simulated time of the failing event.
        time: f64,
        /// Debug rendering of the event kind.
        kind: String,
        /// Handler diagnostic.
        message: String,
    },

    /// An error raised while handling an event, tagged with where it happened.
    #[error("Event {kind} failed at time {time}: {source}")]
    EventFailed {
        /// Simulated time of the failing event.
        time: f64,
        /// Debug rendering of the event kind.
        kind: String,
        /// Underlying error.
        #[source]
        source: Box<SimError>,
    },

    // ===== Parameter Errors =====
    /// Invalid variate or model parameter.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A bounded queue exceeded its capacity.
    #[error("Queue overflow at time {time}: more than {limit} waiting")]
    QueueOverflow {
        /// Simulated time of the overflowing arrival.
        time: f64,
        /// Configured queue capacity.
        limit: usize,
    },

    // ===== Configuration Errors =====
    /// Invalid configuration parameter.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    // ===== I/O Errors =====
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SimError {
    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid-parameter error.
    #[must_use]
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Tag an error raised by a handler with the event's time and kind.
    ///
    /// `Handler` and `QueueOverflow` already carry their context and are
    /// returned unchanged.
    #[must_use]
    pub fn in_event(self, time: f64, kind: impl Into<String>) -> Self {
        match self {
            Self::Handler { .. } | Self::QueueOverflow { .. } | Self::EventFailed { .. } => self,
            other => Self::EventFailed {
                time,
                kind: kind.into(),
                source: Box::new(other),
            },
        }
    }

    /// Check if this error signals a broken kernel invariant rather than bad input.
    #[must_use]
    pub const fn is_fatal_kernel_error(&self) -> bool {
        matches!(
            self,
            Self::EventListEmpty { .. } | Self::ClockRegression { .. } | Self::AlreadyTerminated
        )
    }
}
