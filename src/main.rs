//! `sentinel` binary entry point.

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use service_sentinel::cli_app::{Cli, run};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            if err.needs_setup() {
                eprintln!("{} run `sentinel setup` to choose services to monitor", "hint:".cyan());
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
