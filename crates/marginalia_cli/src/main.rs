//! Smoke CLI over `marginalia_core`.
//!
//! Prints JSON on success. On failure prints `error=<kind>` to stderr and
//! exits non-zero.

use clap::Parser;
use std::process::ExitCode;

mod cli;
mod commands;
mod config;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match commands::run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!(
                "event=cli_command module=cli status=error kind={}",
                err.kind()
            );
            eprintln!("error={} message={err}", err.kind());
            ExitCode::FAILURE
        }
    }
}
