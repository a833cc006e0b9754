//! # Add Command Implementation
//!
//! Inserts or replaces one package entry in the root `git-pm.yaml`. The
//! command only edits the manifest; it does not fetch or install.

use std::env;

use anyhow::Result;
use clap::{Args, ValueEnum};

use git_pm::manifest::{
    validate_package_name, Manifest, PackageSource, PackageSpec, Ref, MANIFEST_FILENAME,
};
use git_pm::urls::RepoId;

/// Reference types accepted by `--ref-type`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RefType {
    Tag,
    Branch,
    Commit,
}

/// Add or update a package in the manifest
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Package name (how the package is referenced in the workspace)
    pub name: String,

    /// Repository identifier (e.g. github.com/owner/repo or
    /// dev.azure.com/org/project/_git/repo)
    pub repo: String,

    /// Path within the repository to the package (default: repository root)
    #[arg(long, default_value = "")]
    pub path: String,

    /// Reference type
    #[arg(long, value_enum, default_value = "branch")]
    pub ref_type: RefType,

    /// Reference value: tag name, branch name, or commit SHA
    #[arg(long, default_value = "main")]
    pub ref_value: String,
}

/// Execute the `add` command.
pub fn execute(args: AddArgs) -> Result<()> {
    let workspace_root = env::current_dir()?;
    let manifest_path = workspace_root.join(MANIFEST_FILENAME);

    validate_package_name(&args.name, MANIFEST_FILENAME)?;

    let reference = match args.ref_type {
        RefType::Tag => Ref::Tag(args.ref_value.clone()),
        RefType::Branch => Ref::Branch(args.ref_value.clone()),
        RefType::Commit => Ref::Commit(args.ref_value.clone()),
    };
    let spec = PackageSpec {
        name: args.name.clone(),
        source: PackageSource::Git {
            repo: RepoId::new(&args.repo),
            path: args.path.clone(),
            reference: reference.clone(),
        },
    };

    let mut manifest = Manifest::load(&manifest_path)?;
    let replaced = manifest.upsert(spec);
    manifest.save(&manifest_path)?;

    if replaced {
        println!("✅ Updated package '{}' in {MANIFEST_FILENAME}", args.name);
    } else {
        println!("✅ Added package '{}' to {MANIFEST_FILENAME}", args.name);
    }
    println!();
    println!("  Name: {}", args.name);
    println!("  Repo: {}", RepoId::new(&args.repo));
    println!(
        "  Path: {}",
        if args.path.is_empty() { "(root)" } else { &args.path }
    );
    println!("  Ref:  {reference}");
    println!();
    println!("Run 'git-pm install' to install the package");
    Ok(())
}
