//! CLI module for evsim.
//!
//! All command logic lives here so it can be tested without spawning the
//! binary; `main.rs` only parses arguments and calls [`run_cli`].

mod args;
mod commands;
mod output;

pub use args::{Args, Command};
pub use commands::{init_logging, run_cli, run_scenario, validate_scenario};
pub use output::{describe_scenario, render_report, write_report};
