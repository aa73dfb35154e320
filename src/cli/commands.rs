//! CLI command handlers.

use std::path::Path;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use super::output::{describe_scenario, render_report, write_report};
use super::{Args, Command};
use crate::config::ScenarioConfig;
use crate::error::SimResult;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` when verbose.
/// Logs go to stderr so reports on stdout stay clean.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Main CLI entry point.
#[must_use]
pub fn run_cli(args: Args) -> ExitCode {
    let result = match args.command {
        Command::Run {
            scenario,
            seed,
            output,
            json,
            verbose: _,
        } => run_scenario(&scenario, seed, output.as_deref(), json),
        Command::Validate { scenario } => validate_scenario(&scenario),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Load, run and report a scenario.
///
/// # Errors
///
/// Returns error if loading, running or writing the report fails.
pub fn run_scenario(
    path: &Path,
    seed: Option<u64>,
    output: Option<&Path>,
    json: bool,
) -> SimResult<()> {
    let config = ScenarioConfig::load(path)?;
    info!(scenario = %path.display(), model = config.model.kind(), "scenario loaded");

    let report = config.run(seed)?;
    write_report(&render_report(&report, json)?, output)
}

/// Load and validate a scenario without running it.
///
/// # Errors
///
/// Returns error if the file cannot be read or fails validation.
pub fn validate_scenario(path: &Path) -> SimResult<()> {
    let config = ScenarioConfig::load(path)?;
    println!("{}", describe_scenario(&config));
    println!("OK");
    Ok(())
}
