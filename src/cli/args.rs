//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Discrete-event simulation runner.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "evsim", author, version, about, long_about = None)]
pub struct Args {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a scenario and print its report
    Run {
        /// Path to the scenario YAML file.
        scenario: PathBuf,

        /// Override the scenario seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Write the report to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit the report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Enable debug logging.
        #[arg(short, long, default_value_t = false)]
        verbose: bool,
    },
    /// Parse and validate a scenario without running it
    Validate {
        /// Path to the scenario YAML file.
        scenario: PathBuf,
    },
}

impl Command {
    /// Whether debug logging was requested.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        matches!(self, Self::Run { verbose: true, .. })
    }
}
