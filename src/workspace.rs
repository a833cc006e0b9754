//! # Workspace Maintenance
//!
//! Side effects around the installed tree: the generated `.git-pm.env`
//! file, idempotent `.gitignore` management, and the orphan pruning that
//! backs cascading removal.
//!
//! The environment file is regenerated from scratch after every
//! successful install; the engine never reads it back. The ignore file is
//! only ever appended to: unrelated content is never reordered, rewritten,
//! or deleted, and a managed entry is added at most once across any number
//! of runs.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::fsutil;
use crate::install::CHILD_LINK_DIRNAME;
use crate::manifest::LOCAL_OVERRIDE_FILENAME;
use crate::resolver::Resolution;

/// Generated environment file at the workspace root.
pub const ENV_FILENAME: &str = ".git-pm.env";

/// The version-control ignore file the maintainer appends to.
pub const GITIGNORE_FILENAME: &str = ".gitignore";

/// Section header written when the ignore file is created from scratch.
const GITIGNORE_SECTION_HEADER: &str = "# git-pm (managed)";

/// The absolute packages directory of a workspace.
pub fn packages_dir(workspace_root: &Path, config: &Config) -> PathBuf {
    if config.packages_dir.is_absolute() {
        config.packages_dir.clone()
    } else {
        workspace_root.join(&config.packages_dir)
    }
}

/// Environment-variable-safe spelling of a package name: characters
/// outside `[A-Za-z0-9_]` become `_`, letters are uppercased.
pub fn sanitize_env_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ch.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Regenerate `.git-pm.env` with absolute paths for external scripts:
/// the packages directory, the project root, and one variable per
/// installed package in install order.
pub fn write_env_file(
    workspace_root: &Path,
    config: &Config,
    resolution: &Resolution,
) -> Result<PathBuf> {
    let packages_dir = packages_dir(workspace_root, config);
    let mut content = String::new();
    content.push_str(&format!("GIT_PM_PACKAGES_DIR={}\n", packages_dir.display()));
    content.push_str(&format!("GIT_PM_PROJECT_ROOT={}\n", workspace_root.display()));
    for package in resolution.in_order() {
        content.push_str(&format!(
            "GIT_PM_PACKAGE_{}={}\n",
            sanitize_env_name(&package.name),
            packages_dir.join(&package.name).display()
        ));
    }

    let path = workspace_root.join(ENV_FILENAME);
    fs::write(&path, content).map_err(|e| fsutil::write_error(&path, e))?;
    debug!("Wrote {}", path.display());
    Ok(path)
}

/// The fixed entry list the maintainer keeps in the ignore file.
pub fn managed_entries(config: &Config) -> Vec<String> {
    vec![
        format!("{}/", config.packages_dir.display()),
        ENV_FILENAME.to_string(),
        LOCAL_OVERRIDE_FILENAME.to_string(),
    ]
}

/// Idempotently ensure the managed entries are present in `.gitignore`.
///
/// Creates the file under a labeled section header when absent; otherwise
/// appends only the entries not already covered. Returns whether the file
/// changed.
pub fn ensure_gitignore(workspace_root: &Path, config: &Config) -> Result<bool> {
    let path = workspace_root.join(GITIGNORE_FILENAME);
    let entries = managed_entries(config);

    if !path.exists() {
        let mut content = format!("{GITIGNORE_SECTION_HEADER}\n");
        for entry in &entries {
            content.push_str(entry);
            content.push('\n');
        }
        fs::write(&path, content).map_err(|e| fsutil::write_error(&path, e))?;
        info!("Created {}", path.display());
        return Ok(true);
    }

    let existing = fs::read_to_string(&path)?;
    let lines: Vec<&str> = existing.lines().collect();
    let missing: Vec<&String> = entries
        .iter()
        .filter(|entry| !entry_present(&lines, entry))
        .collect();
    if missing.is_empty() {
        return Ok(false);
    }

    let mut content = existing;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    for entry in missing {
        content.push_str(entry);
        content.push('\n');
    }
    fs::write(&path, content).map_err(|e| fsutil::write_error(&path, e))?;
    info!("Updated {}", path.display());
    Ok(true)
}

/// Whether an existing ignore line already covers a managed entry.
///
/// Tolerant of trailing-slash variants and of broader directory patterns
/// (a line `.git-packages` covers the entry `.git-packages/`).
fn entry_present(lines: &[&str], entry: &str) -> bool {
    let entry_normalized = entry.trim_end_matches('/');
    lines.iter().any(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return false;
        }
        let line_normalized = line.trim_start_matches('/').trim_end_matches('/');
        line_normalized == entry_normalized
            || entry_normalized.starts_with(&format!("{line_normalized}/"))
    })
}

/// Delete every packages-directory entry whose name is not in `keep`,
/// along with any child link elsewhere in the tree that pointed at it.
/// Returns the removed names.
pub fn prune_orphans(
    workspace_root: &Path,
    config: &Config,
    keep: &HashSet<String>,
) -> Result<Vec<String>> {
    let packages_dir = packages_dir(workspace_root, config);
    if !packages_dir.exists() {
        return Ok(Vec::new());
    }

    let mut removed = Vec::new();
    for entry in fs::read_dir(&packages_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !keep.contains(&name) {
            info!("Removing {name}");
            fsutil::remove_path(&entry.path())?;
            removed.push(name);
        }
    }

    // Drop child links that pointed at removed packages.
    for entry in fs::read_dir(&packages_dir)? {
        let entry = entry?;
        let child_dir = entry.path().join(CHILD_LINK_DIRNAME);
        if !child_dir.is_dir() {
            continue;
        }
        for child in fs::read_dir(&child_dir)? {
            let child = child?;
            let child_name = child.file_name().to_string_lossy().into_owned();
            if !keep.contains(&child_name) {
                fsutil::remove_path(&child.path())?;
            }
        }
        if fs::read_dir(&child_dir)?.next().is_none() {
            fsutil::remove_path(&child_dir)?;
        }
    }

    removed.sort();
    Ok(removed)
}
