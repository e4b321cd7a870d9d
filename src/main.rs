//! Agentry: file-backed agent execution pipeline.
//!
//! This is the main entry point for the `agentry` CLI. It parses arguments,
//! sets up diagnostic logging, dispatches to the appropriate command handler,
//! and handles errors with proper exit codes.

use agentry::cli::Cli;
use agentry::{commands, exit_codes};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `agentry=debug`).
const LOG_ENV: &str = "AGENTRY_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing();

    match commands::dispatch(cli.command) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// Log to stderr, filtered by `AGENTRY_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
