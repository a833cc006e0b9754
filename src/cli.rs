//! # CLI Argument Parsing and Command Dispatch
//!
//! This module defines the command-line interface for the `git-pm` tool
//! using the `clap` library. It is responsible for:
//!
//! - Defining the top-level CLI structure, including global arguments like
//!   `--color` and `--log-level`.
//! - Defining the available subcommands (`install`, `add`, `remove`, …).
//! - Dispatching to the command implementation under `src/commands/`.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use crate::commands;

/// git-pm - materialize git repository subtrees as workspace packages
#[derive(Parser, Debug)]
#[command(name = "git-pm")]
#[command(
    version,
    about,
    long_about = "git-pm - a git-backed package manager using sparse checkouts"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Increase output verbosity (can be repeated: --verbose --verbose)
    #[arg(long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Suppress output except errors
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install packages from the manifest
    Install(commands::install::InstallArgs),

    /// Add or update a package in the manifest
    Add(commands::add::AddArgs),

    /// Remove a package and prune unused dependencies
    Remove(commands::remove::RemoveArgs),

    /// List declared packages and their install status
    List(commands::list::ListArgs),

    /// Remove installed packages and the generated environment file
    Clean(commands::clean::CleanArgs),

    /// Read or write configuration values
    Config(commands::config::ConfigArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the parsed CLI command
    pub fn execute(self) -> Result<()> {
        self.init_logger()?;

        match self.command {
            Commands::Install(args) => commands::install::execute(args),
            Commands::Add(args) => commands::add::execute(args),
            Commands::Remove(args) => commands::remove::execute(args),
            Commands::List(args) => commands::list::execute(args),
            Commands::Clean(args) => commands::clean::execute(args),
            Commands::Config(args) => commands::config::execute(args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }

    /// Initialize the logger with the specified log level and color settings
    fn init_logger(&self) -> Result<()> {
        let log_level = self.parse_log_level()?;
        let use_color = self.should_use_color();

        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .write_style(if use_color {
                env_logger::WriteStyle::Auto
            } else {
                env_logger::WriteStyle::Never
            })
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

        Ok(())
    }

    /// Parse the log level, considering --verbose and --quiet flags
    ///
    /// Priority order:
    /// 1. --quiet (always sets to Error level)
    /// 2. --verbose (sets Debug for 1, Trace for 2+)
    /// 3. --log-level (explicit level)
    fn parse_log_level(&self) -> Result<LevelFilter> {
        if self.quiet {
            return Ok(LevelFilter::Error);
        }

        if self.verbose > 0 {
            return Ok(match self.verbose {
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            });
        }

        match self.log_level.to_lowercase().as_str() {
            "error" => Ok(LevelFilter::Error),
            "warn" => Ok(LevelFilter::Warn),
            "info" => Ok(LevelFilter::Info),
            "debug" => Ok(LevelFilter::Debug),
            "trace" => Ok(LevelFilter::Trace),
            "off" => Ok(LevelFilter::Off),
            _ => Err(anyhow::anyhow!(
                "Invalid log level: '{}'. Valid options are: error, warn, info, debug, trace, off",
                self.log_level
            )),
        }
    }

    /// Determine whether to use color output based on the color setting
    fn should_use_color(&self) -> bool {
        match self.color.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            "auto" => console::Term::stdout().features().colors_supported(),
            _ => {
                eprintln!(
                    "Warning: Invalid color option '{}', using 'auto'. Valid options are: always, never, auto",
                    self.color
                );
                console::Term::stdout().features().colors_supported()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_level(log_level: &str, verbose: u8, quiet: bool) -> Cli {
        Cli {
            command: Commands::List(commands::list::ListArgs {}),
            color: "auto".to_string(),
            log_level: log_level.to_string(),
            verbose,
            quiet,
        }
    }

    #[test]
    fn test_parse_log_level_default() {
        assert_eq!(
            cli_with_level("warn", 0, false).parse_log_level().unwrap(),
            LevelFilter::Warn
        );
    }

    #[test]
    fn test_verbose_overrides_log_level() {
        assert_eq!(
            cli_with_level("info", 1, false).parse_log_level().unwrap(),
            LevelFilter::Debug
        );
        assert_eq!(
            cli_with_level("info", 2, false).parse_log_level().unwrap(),
            LevelFilter::Trace
        );
    }

    #[test]
    fn test_quiet_overrides_everything() {
        assert_eq!(
            cli_with_level("debug", 0, true).parse_log_level().unwrap(),
            LevelFilter::Error
        );
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        assert!(cli_with_level("loud", 0, false).parse_log_level().is_err());
    }
}
