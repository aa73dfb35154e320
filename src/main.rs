//! evsim CLI - discrete-event simulation runner.
//!
//! Usage:
//!   evsim run <scenario.yaml> [--seed N] [--output FILE] [--verbose]
//!   evsim validate <scenario.yaml>

use std::process::ExitCode;

use clap::Parser;
use evsim::cli::{init_logging, run_cli, Args};

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.command.verbose());
    run_cli(args)
}
