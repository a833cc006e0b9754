//! Directory link strategies.
//!
//! The installer prefers symbolic links, falls back to directory junctions
//! where symlink creation needs an unheld privilege, and copies directory
//! contents as the last resort. Strategy selection is probe-driven: one
//! throwaway link decides the starting strategy for the invocation, and a
//! later per-operation failure can still downgrade it.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};

/// How a directory "link" gets created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStrategy {
    /// A symbolic link (relative target where possible).
    Symlink,
    /// A directory junction (absolute target; Windows only).
    Junction,
    /// A full copy of the target's contents.
    Copy,
}

impl std::fmt::Display for LinkStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkStrategy::Symlink => write!(f, "symlink"),
            LinkStrategy::Junction => write!(f, "junction"),
            LinkStrategy::Copy => write!(f, "copy"),
        }
    }
}

impl LinkStrategy {
    /// The next strategy to try after this one fails.
    pub fn fallback(self) -> Option<LinkStrategy> {
        match self {
            LinkStrategy::Symlink => Some(LinkStrategy::Junction),
            LinkStrategy::Junction => Some(LinkStrategy::Copy),
            LinkStrategy::Copy => None,
        }
    }
}

/// Create a symbolic link at `link` pointing to `target` (a directory).
#[cfg(unix)]
pub fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

/// Create a symbolic link at `link` pointing to `target` (a directory).
#[cfg(windows)]
pub fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

/// Create a directory junction at `link` pointing to `target`.
///
/// Junctions exist only on Windows; elsewhere this reports failure so the
/// caller moves on to the copy fallback.
pub fn create_junction(target: &Path, link: &Path) -> Result<()> {
    #[cfg(windows)]
    {
        let output = std::process::Command::new("cmd")
            .args(["/c", "mklink", "/J"])
            .arg(link)
            .arg(target)
            .output()
            .map_err(|e| Error::WriteFailure {
                path: link.to_path_buf(),
                message: e.to_string(),
            })?;
        if output.status.success() {
            Ok(())
        } else {
            Err(Error::WriteFailure {
                path: link.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
    #[cfg(not(windows))]
    {
        let _ = target;
        Err(Error::WriteFailure {
            path: link.to_path_buf(),
            message: "directory junctions are only available on Windows".to_string(),
        })
    }
}

/// Probe whether symbolic-link creation works under `scratch_dir`.
///
/// Creates and removes a throwaway link. The result stands in for the
/// whole invocation; the installer caches it.
pub fn probe_symlink(scratch_dir: &Path) -> bool {
    if fs::create_dir_all(scratch_dir).is_err() {
        return false;
    }
    let target = scratch_dir.join(".git-pm-probe-target");
    let link = scratch_dir.join(".git-pm-probe-link");
    let _ = fs::remove_dir_all(&target);
    let _ = remove_link(&link);
    if fs::create_dir(&target).is_err() {
        return false;
    }
    let supported = symlink_dir(&target, &link).is_ok();
    let _ = remove_link(&link);
    let _ = fs::remove_dir_all(&target);
    supported
}

/// Remove a link created by any strategy's link-shaped variants.
#[cfg(unix)]
pub fn remove_link(link: &Path) -> io::Result<()> {
    fs::remove_file(link)
}

/// Remove a link created by any strategy's link-shaped variants.
#[cfg(windows)]
pub fn remove_link(link: &Path) -> io::Result<()> {
    // Symlinked or junctioned directories unlink as directories.
    fs::remove_dir(link).or_else(|_| fs::remove_file(link))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_ladder() {
        assert_eq!(LinkStrategy::Symlink.fallback(), Some(LinkStrategy::Junction));
        assert_eq!(LinkStrategy::Junction.fallback(), Some(LinkStrategy::Copy));
        assert_eq!(LinkStrategy::Copy.fallback(), None);
    }

    #[test]
    fn test_probe_cleans_up_after_itself() {
        let temp = tempfile::tempdir().unwrap();
        let supported = probe_symlink(temp.path());
        // Unix test environments support symlinks.
        #[cfg(unix)]
        assert!(supported);
        let _ = supported;
        assert!(!temp.path().join(".git-pm-probe-target").exists());
        assert!(!temp.path().join(".git-pm-probe-link").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_dir_resolves() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("target");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("file.txt"), "content").unwrap();

        let link = temp.path().join("link");
        symlink_dir(&target, &link).unwrap();
        assert_eq!(fs::read_to_string(link.join("file.txt")).unwrap(), "content");
    }

    #[cfg(not(windows))]
    #[test]
    fn test_junction_unavailable_off_windows() {
        let temp = tempfile::tempdir().unwrap();
        let err = create_junction(&temp.path().join("t"), &temp.path().join("l")).unwrap_err();
        assert_eq!(err.kind_tag(), "write_failure");
    }
}
