//! Example models built on the kernel.
//!
//! - [`queue`]: single-server FIFO queue (M/M/1 with a capacity limit)
//! - [`inventory`]: single-product (s, S) inventory with backlogging

pub mod inventory;
pub mod queue;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use inventory::{
    InventoryEvent, InventoryParams, InventoryPolicy, InventoryReport, InventoryStat,
    InventorySystem, PolicyReport,
};
pub use queue::{QueueEvent, QueueParams, QueueReport, QueueStat, ServerStatus, SingleServerQueue};

/// Report of whichever model a scenario ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioReport {
    /// Single-server queue results.
    Queue(QueueReport),
    /// Inventory policy sweep results.
    Inventory(InventoryReport),
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queue(report) => report.fmt(f),
            Self::Inventory(report) => report.fmt(f),
        }
    }
}
