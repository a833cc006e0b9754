//! Filesystem helpers for the installer and workspace maintainer.
//!
//! Copies strip embedded `.git` metadata so workspace packages are plain
//! directories, and removal clears read-only attributes before retrying on
//! platforms that enforce per-file write permission.

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Map an I/O failure at `path` to the engine's error kinds.
pub fn write_error(path: &Path, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::PermissionDenied {
        Error::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else {
        Error::WriteFailure {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Recursively copy `source` into `target`, skipping any `.git` directory.
///
/// Symlinks inside the source are followed, so the copy contains regular
/// files only.
pub fn copy_dir(source: &Path, target: &Path) -> Result<()> {
    fs::create_dir_all(target).map_err(|e| write_error(target, e))?;

    let walker = WalkDir::new(source)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");

    for entry in walker {
        let entry = entry.map_err(|e| Error::WriteFailure {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;
        let relative = match entry.path().strip_prefix(source) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative,
            _ => continue,
        };
        let dest = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|e| write_error(&dest, e))?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
            }
            fs::copy(entry.path(), &dest).map_err(|e| write_error(&dest, e))?;
        }
    }
    Ok(())
}

/// Remove a file, directory, or link at `path`, if present.
///
/// A failed directory removal clears read-only attributes throughout the
/// subtree and retries once.
pub fn remove_path(path: &Path) -> Result<()> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(());
    };

    let outcome = if metadata.file_type().is_symlink() {
        crate::links::remove_link(path)
    } else if metadata.is_dir() {
        fs::remove_dir_all(path).or_else(|_| {
            clear_readonly(path);
            fs::remove_dir_all(path)
        })
    } else {
        fs::remove_file(path).or_else(|_| {
            let mut permissions = metadata.permissions();
            #[allow(clippy::permissions_set_readonly_false)]
            permissions.set_readonly(false);
            let _ = fs::set_permissions(path, permissions);
            fs::remove_file(path)
        })
    };

    outcome.map_err(|e| write_error(path, e))
}

fn clear_readonly(root: &Path) {
    for entry in WalkDir::new(root).into_iter().flatten() {
        if let Ok(metadata) = entry.metadata() {
            let mut permissions = metadata.permissions();
            if permissions.readonly() {
                #[allow(clippy::permissions_set_readonly_false)]
                permissions.set_readonly(false);
                let _ = fs::set_permissions(entry.path(), permissions);
            }
        }
    }
}
