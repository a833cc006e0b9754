//! # Config Command Implementation
//!
//! Reads and writes single keys in the project-scope config
//! (`git-pm.config.yaml`) or, with `--global`, the user-scope config
//! (`~/.git-pm/config.yaml`). `--list` prints the effective merged values
//! with the source each one came from. Keys outside the recognized set
//! are rejected.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;

use git_pm::config::{
    self, get_key, load_file, load_with_sources, project_config_path, save_file, set_key,
    unset_key,
};

/// Read or write configuration values
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Configuration key (e.g. packages_dir, cache_dir,
    /// git_protocol.github.com, url_patterns.<host>, azure_devops_pat)
    pub key: Option<String>,

    /// New value for the key; omit to print the current value
    pub value: Option<String>,

    /// Remove the key from the selected scope
    #[arg(long, conflicts_with = "value")]
    pub unset: bool,

    /// Print effective merged values with their sources
    #[arg(long, conflicts_with_all = ["key", "value", "unset"])]
    pub list: bool,

    /// Operate on the user-scope config instead of the project scope
    #[arg(long)]
    pub global: bool,
}

/// Execute the `config` command.
pub fn execute(args: ConfigArgs) -> Result<()> {
    let workspace_root = env::current_dir()?;

    if args.list {
        let (_, sources) = load_with_sources(&workspace_root)?;
        for (key, value, source) in sources {
            let shown = if value.is_empty() { "(unset)" } else { &value };
            println!("{key} = {shown}  [{source}]");
        }
        return Ok(());
    }

    let key = args
        .key
        .ok_or_else(|| anyhow!("a key is required (or use --list)"))?;
    let scope_path = scope_path(&workspace_root, args.global)?;
    let mut file = load_file(&scope_path)?;

    if args.unset {
        if unset_key(&mut file, &key)? {
            save_file(&scope_path, &file)?;
            println!("Unset {key}");
        } else {
            println!("{key} was not set in {}", scope_path.display());
        }
        return Ok(());
    }

    match args.value {
        Some(value) => {
            set_key(&mut file, &key, &value)?;
            save_file(&scope_path, &file)?;
            println!("Set {key} = {value}");
        }
        None => match get_key(&file, &key)? {
            Some(value) => println!("{value}"),
            None => println!("(unset)"),
        },
    }
    Ok(())
}

fn scope_path(workspace_root: &std::path::Path, global: bool) -> Result<PathBuf> {
    if global {
        config::user_config_path().ok_or_else(|| anyhow!("cannot determine the home directory"))
    } else {
        Ok(project_config_path(workspace_root))
    }
}
