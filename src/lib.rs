//! # evsim
//!
//! Next-event time-advance discrete-event simulation kernel.
//!
//! The kernel owns the machinery every such simulation shares:
//! - Event list with one slot per event kind, earliest-first selection
//! - Monotonic simulation clock
//! - Time-weighted area accumulation for time averages
//! - Seeded, partitionable variate generation
//!
//! Domain models plug in through the [`engine::Model`] trait. Two are
//! bundled: a single-server queue and an (s, S) inventory system.
//!
//! ## Example
//!
//! ```rust
//! use evsim::prelude::*;
//! use evsim::models::{queue, QueueParams};
//!
//! let params = QueueParams::new(1.0, 0.5, 100);
//! let report = queue::simulate(&params, SimRng::new(42)).unwrap();
//! assert_eq!(report.customers_delayed, 100);
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suboptimal_flops,
    clippy::missing_const_for_fn,  // Many functions can't be const in stable Rust
)]

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{ModelConfig, ScenarioConfig};
    pub use crate::engine::{
        EventContext, EventList, Interval, Model, RunSummary, SimEngine, SimRng, SimTime,
        TimeAverageStats, VariateGenerator,
    };
    pub use crate::error::{SimError, SimResult};
    pub use crate::models::ScenarioReport;
}

/// Re-export for public API
pub use error::{SimError, SimResult};
