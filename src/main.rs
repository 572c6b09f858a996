//! Batch converter entrypoint: saved calendar pages → ordered CSV.

use clap::Parser;
use econ_calendar_csv::cli::{self, Cli};
use econ_calendar_csv::observability::init_tracing;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Load .env if present; no-op otherwise.
    let _ = dotenvy::dotenv();

    let args = Cli::parse();
    init_tracing(args.log_format);

    match cli::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
