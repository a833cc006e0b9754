//! # Completions Command Implementation
//!
//! Writes a shell completion script for the `git-pm` CLI to stdout. The
//! script is produced by `clap_complete` from the same parser definition
//! the binary runs, so it covers every subcommand and global flag.
//!
//! ```bash
//! git-pm completions bash > /etc/bash_completion.d/git-pm
//! git-pm completions zsh > "${fpath[1]}/_git-pm"
//! git-pm completions fish > ~/.config/fish/completions/git-pm.fish
//! ```

use std::io;

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use crate::cli::Cli;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for
    /// (bash, zsh, fish, powershell, elvish)
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Execute the `completions` command.
///
/// Output goes to stdout only; redirect it into the shell's completion
/// directory. Nothing else may be printed here or the script would be
/// corrupted.
pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();
    generate(args.shell, &mut command, bin_name, &mut io::stdout());
    Ok(())
}
