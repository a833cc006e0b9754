//! # Install Command Implementation
//!
//! Runs the full pipeline: configuration, manifest loading, recursive
//! dependency resolution, two-pass installation, and workspace
//! maintenance (`.git-pm.env` regeneration and `.gitignore` updates).

use std::env;

use anyhow::Result;
use clap::Args;

use git_pm::config;
use git_pm::fetch::Fetcher;
use git_pm::install::{Installer, LogReporter};
use git_pm::manifest::WorkspaceManifests;
use git_pm::resolver::Resolver;
use git_pm::urls::AuthEnv;
use git_pm::workspace;

/// Install packages from the manifest
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Do not create or update the workspace .gitignore
    #[arg(long)]
    pub no_gitignore: bool,

    /// Install only the direct root entries, without reading nested
    /// manifests
    #[arg(long)]
    pub no_resolve_deps: bool,
}

/// Execute the `install` command.
pub fn execute(args: InstallArgs) -> Result<()> {
    let workspace_root = env::current_dir()?;
    let config = config::load(&workspace_root)?;
    let manifests = WorkspaceManifests::load(&workspace_root)?;
    let effective = manifests.effective();

    let mut fetcher = Fetcher::new(config.clone(), AuthEnv::from_env(), workspace_root.clone());
    let mut resolver = Resolver::new(&mut fetcher, &workspace_root, manifests.overrides.clone());
    if args.no_resolve_deps {
        resolver = resolver.without_dep_resolution();
    }
    let resolution = resolver.resolve(&effective)?;

    let mut reporter = LogReporter;
    let mut installer = Installer::new(&config, &workspace_root, &mut reporter);
    let installed = installer.install(&resolution)?;

    if !args.no_gitignore {
        workspace::ensure_gitignore(&workspace_root, &config)?;
    }
    workspace::write_env_file(&workspace_root, &config, &resolution)?;

    println!("✅ Installed {installed} package(s)");
    Ok(())
}
