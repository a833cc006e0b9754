//! # Remove Command Implementation
//!
//! Cascading removal: drop the package from the manifest(s), re-run
//! discovery against the survivors, and delete every installed directory
//! no longer required by any surviving root, together with child links
//! that pointed at it. The environment file is regenerated afterwards.

use std::collections::HashSet;
use std::env;

use anyhow::Result;
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm};

use git_pm::config;
use git_pm::fetch::Fetcher;
use git_pm::manifest::{WorkspaceManifests, LOCAL_OVERRIDE_FILENAME, MANIFEST_FILENAME};
use git_pm::resolver::Resolver;
use git_pm::urls::AuthEnv;
use git_pm::workspace;
use git_pm::Error;

/// Remove a package and prune dependencies it no longer requires
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Package name to remove
    pub name: String,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

/// Execute the `remove` command.
pub fn execute(args: RemoveArgs) -> Result<()> {
    let workspace_root = env::current_dir()?;
    let config = config::load(&workspace_root)?;
    let mut manifests = WorkspaceManifests::load(&workspace_root)?;

    if !manifests.root.contains(&args.name) && !manifests.overrides.contains(&args.name) {
        return Err(Error::PackageNotInstalled { name: args.name }.into());
    }

    if !args.yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Remove package '{}' and prune dependencies no longer required?",
                args.name
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    // Edit the manifests first; discovery below runs against the survivors.
    if manifests.root.remove(&args.name) {
        manifests.root.save(&workspace_root.join(MANIFEST_FILENAME))?;
    }
    let override_path = workspace_root.join(LOCAL_OVERRIDE_FILENAME);
    if manifests.overrides.remove(&args.name) && override_path.exists() {
        manifests.overrides.save(&override_path)?;
    }

    let effective = manifests.effective();
    let mut fetcher = Fetcher::new(config.clone(), AuthEnv::from_env(), workspace_root.clone());
    let resolution = Resolver::new(&mut fetcher, &workspace_root, manifests.overrides.clone())
        .resolve(&effective)?;

    let keep: HashSet<String> = resolution.names().map(str::to_string).collect();
    let removed = workspace::prune_orphans(&workspace_root, &config, &keep)?;
    workspace::write_env_file(&workspace_root, &config, &resolution)?;

    if removed.is_empty() {
        println!("✅ Removed '{}' from the manifest (nothing to prune)", args.name);
    } else {
        println!("✅ Removed {}: {}", removed.len(), removed.join(", "));
    }
    Ok(())
}
