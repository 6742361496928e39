//! Windlass CLI - remote command execution and live telemetry from the
//! terminal
//!
//! Provides `check`, `run`, `stream`, and `metrics` commands over the same
//! core the dashboard uses.

mod cli;
mod commands;
mod error;
mod util;

use clap::Parser;
use cli::Cli;
use windlass_core::tracing::{TracingConfig, TracingLevel, init_tracing};

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        TracingLevel::Error
    } else {
        match cli.verbose {
            0 => TracingLevel::Warn,
            1 => TracingLevel::Info,
            2 => TracingLevel::Debug,
            _ => TracingLevel::Trace,
        }
    };
    let _ = init_tracing(TracingConfig::new().with_level(level));

    let result = commands::dispatch(cli);

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
