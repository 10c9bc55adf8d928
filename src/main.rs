//! Quarry CLI - plan and simulate resource-goal execution

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = quarry::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
