//! # Clean Command Implementation
//!
//! Deletes the packages directory and the generated environment file,
//! leaving manifests and the cache intact. `--cache` additionally empties
//! the checkout cache.

use std::env;

use anyhow::Result;
use clap::Args;

use git_pm::config;
use git_pm::fsutil;
use git_pm::workspace::{self, ENV_FILENAME};

/// Remove installed packages and the generated environment file
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Also empty the checkout cache
    #[arg(long)]
    pub cache: bool,
}

/// Execute the `clean` command.
pub fn execute(args: CleanArgs) -> Result<()> {
    let workspace_root = env::current_dir()?;
    let config = config::load(&workspace_root)?;

    let packages_dir = workspace::packages_dir(&workspace_root, &config);
    if packages_dir.exists() {
        println!("Removing {}...", packages_dir.display());
        fsutil::remove_path(&packages_dir)?;
    } else {
        println!("Nothing to clean - {} does not exist", packages_dir.display());
    }

    fsutil::remove_path(&workspace_root.join(ENV_FILENAME))?;

    if args.cache && config.cache_dir.exists() {
        println!("Removing cache at {}...", config.cache_dir.display());
        fsutil::remove_path(&config.cache_dir)?;
    }

    println!("✅ Cleaned successfully");
    Ok(())
}
