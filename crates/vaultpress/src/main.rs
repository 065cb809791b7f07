#![doc = include_str!("../README.md")]

use std::process::ExitCode;

/// CLI module - command-line interface for vaultpress
mod cli;

/// Editor module - opening editors in the command-line
mod editor;

fn main() -> ExitCode {
    if cli::run_cli() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
