//! # git-pm CLI
//!
//! This is the binary entry point for the `git-pm` command-line tool.
//!
//! Its responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Translating engine errors into a one-line kind + message report and
//!   the matching process exit code.
//!
//! The core application logic lives in the `git_pm` library crate; the
//! binary is a thin wrapper around it.

mod cli;
mod commands;

use clap::Parser;
use git_pm::exit_codes;

fn main() {
    let cli = cli::Cli::parse();
    if let Err(err) = cli.execute() {
        let code = match err.downcast_ref::<git_pm::Error>() {
            Some(engine_err) => {
                eprintln!("error[{}]: {}", engine_err.kind_tag(), engine_err);
                engine_err.exit_code()
            }
            None => {
                eprintln!("error: {err:#}");
                exit_codes::ERROR
            }
        };
        std::process::exit(code);
    }
}
