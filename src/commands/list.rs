//! # List Command Implementation
//!
//! Shows the effective package set (root manifest with local overrides
//! applied) together with each package's install status. Driven entirely
//! by the manifests and the on-disk workspace; there is no lockfile.

use std::env;

use anyhow::Result;
use clap::Args;

use git_pm::config;
use git_pm::manifest::{PackageSource, WorkspaceManifests};
use git_pm::workspace;

/// List declared packages and their install status
#[derive(Args, Debug)]
pub struct ListArgs {}

/// Execute the `list` command.
pub fn execute(_args: ListArgs) -> Result<()> {
    let workspace_root = env::current_dir()?;
    let config = config::load(&workspace_root)?;
    let manifests = WorkspaceManifests::load(&workspace_root)?;
    let effective = manifests.effective();

    if effective.is_empty() {
        println!("No packages declared (git-pm.yaml is empty or missing)");
        return Ok(());
    }

    let packages_dir = workspace::packages_dir(&workspace_root, &config);
    println!("Packages in {}:", packages_dir.display());
    println!();

    for spec in effective.packages() {
        let installed = if packages_dir.join(&spec.name).exists() {
            "✓"
        } else {
            "✗"
        };
        let overridden = if manifests.overrides.contains(&spec.name) {
            " [override]"
        } else {
            ""
        };
        match &spec.source {
            PackageSource::Git {
                repo,
                path,
                reference,
            } => {
                println!("  {installed} {} ({reference}){overridden}", spec.name);
                println!("      Repo: {repo}");
                if !path.is_empty() {
                    println!("      Path: {path}");
                }
            }
            PackageSource::Local { path } => {
                println!("  {installed} {} (local){overridden}", spec.name);
                println!("      Path: {}", path.display());
            }
        }
        println!();
    }
    Ok(())
}
