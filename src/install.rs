//! # Workspace Installation
//!
//! The installer turns a [`Resolution`](crate::resolver::Resolution) into a
//! populated packages directory. It operates in two passes over the
//! topological order:
//!
//! 1. **Materialize**: git-sourced packages are copied out of the cache as
//!    plain directories (all `.git` metadata stripped); local packages are
//!    linked to their source directory. Existing entries are removed
//!    first, clearing read-only files when necessary.
//! 2. **Child links**: every package with direct dependencies gets a
//!    `.git-packages/` subdirectory containing one link per dependency, so
//!    a package sees its dependencies at a stable relative path regardless
//!    of where in a dependency chain it was reached. Pass 1 completes
//!    fully before Pass 2 begins, so link targets always exist.
//!
//! Link strategy is probe-driven (symlink, then junction, then copy) and
//! any downgrade sticks for the remainder of the invocation. Per-package
//! failures abort the install with the partial workspace preserved.
//!
//! One structured [`InstallEvent`] is emitted per package through the
//! [`InstallReporter`] seam; the default reporter logs.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fsutil;
use crate::links::{self, LinkStrategy};
use crate::manifest::PackageSource;
use crate::resolver::{ResolvedPackage, Resolution};

/// Directory inside each installed package holding its dependency links.
///
/// Deliberately a fixed name, independent of the configured
/// `packages_dir`: consumers address dependencies as
/// `<pkg>/.git-packages/<dep>` everywhere.
pub const CHILD_LINK_DIRNAME: &str = ".git-packages";

/// Structured installer progress, consumed by logs and tests. Events do
/// not affect behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallEvent {
    Installing { name: String },
    Copied { name: String },
    Linked { name: String, strategy: LinkStrategy },
    FallbackUsed { name: String, strategy: LinkStrategy },
    Summary { installed: usize, total: usize },
}

/// Consumer of installer events.
pub trait InstallReporter {
    fn event(&mut self, event: &InstallEvent);
}

/// Default reporter forwarding events to the `log` facade.
pub struct LogReporter;

impl InstallReporter for LogReporter {
    fn event(&mut self, event: &InstallEvent) {
        match event {
            InstallEvent::Installing { name } => info!("Installing {name}"),
            InstallEvent::Copied { name } => info!("  copied {name}"),
            InstallEvent::Linked { name, strategy } => info!("  linked {name} ({strategy})"),
            InstallEvent::FallbackUsed { name, strategy } => {
                warn!("  fallback to {strategy} for {name}")
            }
            InstallEvent::Summary { installed, total } => {
                info!("Installed {installed}/{total} package(s)")
            }
        }
    }
}

/// Installs a resolved package set into the workspace.
pub struct Installer<'a> {
    config: &'a Config,
    workspace_root: &'a Path,
    reporter: &'a mut dyn InstallReporter,
    strategy: Option<LinkStrategy>,
}

impl<'a> Installer<'a> {
    pub fn new(
        config: &'a Config,
        workspace_root: &'a Path,
        reporter: &'a mut dyn InstallReporter,
    ) -> Self {
        Self {
            config,
            workspace_root,
            reporter,
            strategy: None,
        }
    }

    /// Force a link strategy instead of probing (diagnostics and tests).
    pub fn with_strategy(mut self, strategy: LinkStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// The absolute packages directory of this workspace.
    pub fn packages_dir(&self) -> PathBuf {
        crate::workspace::packages_dir(self.workspace_root, self.config)
    }

    /// Run both passes. Returns the number of packages installed.
    pub fn install(&mut self, resolution: &Resolution) -> Result<usize> {
        let packages_dir = self.packages_dir();
        fs::create_dir_all(&packages_dir).map_err(|e| fsutil::write_error(&packages_dir, e))?;

        let total = resolution.len();
        let mut installed = 0;
        let mut seen_dirs = HashSet::new();

        for package in resolution.in_order() {
            self.reporter.event(&InstallEvent::Installing {
                name: package.name.clone(),
            });
            // Resolution guarantees unique names, but a case-insensitive
            // filesystem can still fold two of them onto one directory.
            if !seen_dirs.insert(package.name.to_lowercase()) {
                return Err(Error::PathCollision {
                    name: package.name.clone(),
                });
            }
            self.materialize(package, &packages_dir)?;
            installed += 1;
        }

        for package in resolution.in_order() {
            self.wire_child_links(package, &packages_dir)?;
        }

        self.reporter
            .event(&InstallEvent::Summary { installed, total });
        Ok(installed)
    }

    /// Pass 1: place one package at `packages_dir/<name>`.
    fn materialize(&mut self, package: &ResolvedPackage, packages_dir: &Path) -> Result<()> {
        let target = packages_dir.join(&package.name);
        fsutil::remove_path(&target)?;

        match &package.source {
            PackageSource::Local { .. } => {
                let strategy = self.create_link(
                    &package.name,
                    &package.materialized_path,
                    &target,
                    None,
                    packages_dir,
                )?;
                self.reporter.event(&InstallEvent::Linked {
                    name: package.name.clone(),
                    strategy,
                });
            }
            PackageSource::Git { .. } => {
                fsutil::copy_dir(&package.materialized_path, &target)?;
                self.reporter.event(&InstallEvent::Copied {
                    name: package.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Pass 2: wire `<pkg>/.git-packages/<dep>` links.
    fn wire_child_links(&mut self, package: &ResolvedPackage, packages_dir: &Path) -> Result<()> {
        if package.direct_deps.is_empty() {
            return Ok(());
        }

        let child_dir = packages_dir.join(&package.name).join(CHILD_LINK_DIRNAME);
        fs::create_dir_all(&child_dir).map_err(|e| fsutil::write_error(&child_dir, e))?;

        // A locally-linked package lives outside the packages directory, so
        // a relative link target would escape it; those get absolute
        // targets. Copied packages keep the portable relative form.
        let package_is_linked = matches!(package.source, PackageSource::Local { .. });

        for dep in &package.direct_deps {
            let link = child_dir.join(dep);
            fsutil::remove_path(&link)?;
            let dep_target = packages_dir.join(dep);
            let relative = if package_is_linked {
                None
            } else {
                Some(PathBuf::from(format!("../../{dep}")))
            };
            self.create_link(&package.name, &dep_target, &link, relative, packages_dir)?;
        }
        Ok(())
    }

    /// The strategy for this invocation, probing symlink support once.
    fn current_strategy(&mut self, scratch_dir: &Path) -> LinkStrategy {
        if let Some(strategy) = self.strategy {
            return strategy;
        }
        let strategy = if links::probe_symlink(scratch_dir) {
            LinkStrategy::Symlink
        } else {
            warn!(
                "{}",
                Error::SymlinkUnsupported {
                    fallback: LinkStrategy::Junction.to_string()
                }
            );
            LinkStrategy::Junction
        };
        self.strategy = Some(strategy);
        strategy
    }

    /// Create a directory link with the current strategy, degrading down
    /// the ladder on failure. A downgrade sticks for the rest of the
    /// invocation. Returns the strategy that succeeded.
    fn create_link(
        &mut self,
        name: &str,
        target: &Path,
        link: &Path,
        relative_target: Option<PathBuf>,
        scratch_dir: &Path,
    ) -> Result<LinkStrategy> {
        let mut strategy = self.current_strategy(scratch_dir);
        loop {
            let attempt: Result<()> = match strategy {
                LinkStrategy::Symlink => {
                    let link_target = relative_target.as_deref().unwrap_or(target);
                    links::symlink_dir(link_target, link)
                        .map_err(|e| fsutil::write_error(link, e))
                }
                // Junctions cannot carry relative targets.
                LinkStrategy::Junction => links::create_junction(target, link),
                LinkStrategy::Copy => fsutil::copy_dir(target, link),
            };

            match attempt {
                Ok(()) => return Ok(strategy),
                Err(err) => match strategy.fallback() {
                    Some(next) => {
                        warn!(
                            "{} ({err})",
                            Error::SymlinkUnsupported {
                                fallback: next.to_string()
                            }
                        );
                        self.reporter.event(&InstallEvent::FallbackUsed {
                            name: name.to_string(),
                            strategy: next,
                        });
                        self.strategy = Some(next);
                        strategy = next;
                    }
                    None => return Err(err),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Ref;
    use crate::resolver::LOCAL_COMMIT;
    use crate::urls::RepoId;
    use std::collections::HashMap;

    struct RecordingReporter {
        events: Vec<InstallEvent>,
    }

    impl InstallReporter for RecordingReporter {
        fn event(&mut self, event: &InstallEvent) {
            self.events.push(event.clone());
        }
    }

    fn git_package(name: &str, materialized: &Path, deps: &[&str]) -> ResolvedPackage {
        ResolvedPackage {
            name: name.to_string(),
            source: PackageSource::Git {
                repo: RepoId::new("github.com/org/mono"),
                path: name.to_string(),
                reference: Ref::Tag("v1".into()),
            },
            resolved_ref: Ref::Tag("v1".into()),
            original_ref: Ref::Tag("v1".into()),
            commit_sha: "abc123".into(),
            cache_key: Some("deadbeefdeadbeef".into()),
            direct_deps: deps.iter().map(|d| d.to_string()).collect(),
            materialized_path: materialized.to_path_buf(),
        }
    }

    fn local_package(name: &str, materialized: &Path, deps: &[&str]) -> ResolvedPackage {
        ResolvedPackage {
            name: name.to_string(),
            source: PackageSource::Local {
                path: materialized.to_path_buf(),
            },
            resolved_ref: Ref::Commit(LOCAL_COMMIT.into()),
            original_ref: Ref::Commit(LOCAL_COMMIT.into()),
            commit_sha: LOCAL_COMMIT.into(),
            cache_key: None,
            direct_deps: deps.iter().map(|d| d.to_string()).collect(),
            materialized_path: materialized.to_path_buf(),
        }
    }

    fn resolution(packages: Vec<ResolvedPackage>) -> Resolution {
        let order = packages.iter().map(|p| p.name.clone()).collect();
        let map: HashMap<String, ResolvedPackage> = packages
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        Resolution::from_parts(map, order)
    }

    fn seed_tree(dir: &Path, with_git_dir: bool) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("content.txt"), "content").unwrap();
        if with_git_dir {
            fs::create_dir_all(dir.join(".git")).unwrap();
            fs::write(dir.join(".git").join("HEAD"), "ref").unwrap();
        }
    }

    #[test]
    fn test_git_package_is_copied_without_git_metadata() {
        let temp = tempfile::tempdir().unwrap();
        let cache = temp.path().join("cache-entry");
        seed_tree(&cache, true);
        let workspace = temp.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();

        let config = Config::default();
        let mut reporter = RecordingReporter { events: Vec::new() };
        let mut installer = Installer::new(&config, &workspace, &mut reporter);
        installer
            .install(&resolution(vec![git_package("pkg", &cache, &[])]))
            .unwrap();

        let installed = workspace.join(".git-packages").join("pkg");
        assert!(installed.join("content.txt").exists());
        assert!(!installed.join(".git").exists());
        // A plain directory, not a link.
        assert!(!fs::symlink_metadata(&installed).unwrap().file_type().is_symlink());
    }

    #[cfg(unix)]
    #[test]
    fn test_local_package_is_symlinked() {
        let temp = tempfile::tempdir().unwrap();
        let dev_dir = temp.path().join("dev-pkg");
        seed_tree(&dev_dir, false);
        let workspace = temp.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();

        let config = Config::default();
        let mut reporter = RecordingReporter { events: Vec::new() };
        let mut installer = Installer::new(&config, &workspace, &mut reporter);
        installer
            .install(&resolution(vec![local_package("dev", &dev_dir, &[])]))
            .unwrap();

        let installed = workspace.join(".git-packages").join("dev");
        assert!(fs::symlink_metadata(&installed).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&installed).unwrap(), dev_dir);
        assert!(reporter.events.contains(&InstallEvent::Linked {
            name: "dev".into(),
            strategy: LinkStrategy::Symlink
        }));
    }

    #[cfg(unix)]
    #[test]
    fn test_child_links_are_relative_and_resolve() {
        let temp = tempfile::tempdir().unwrap();
        let cache_a = temp.path().join("cache-a");
        let cache_b = temp.path().join("cache-b");
        seed_tree(&cache_a, false);
        seed_tree(&cache_b, false);
        let workspace = temp.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();

        let config = Config::default();
        let mut reporter = RecordingReporter { events: Vec::new() };
        let mut installer = Installer::new(&config, &workspace, &mut reporter);
        installer
            .install(&resolution(vec![
                git_package("b", &cache_b, &[]),
                git_package("a", &cache_a, &["b"]),
            ]))
            .unwrap();

        let link = workspace
            .join(".git-packages")
            .join("a")
            .join(CHILD_LINK_DIRNAME)
            .join("b");
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("../../b"));
        // The relative link resolves to the sibling package.
        assert!(link.join("content.txt").exists());
        // b has no deps, so no child-link directory.
        assert!(!workspace
            .join(".git-packages")
            .join("b")
            .join(CHILD_LINK_DIRNAME)
            .exists());
    }

    #[test]
    fn test_copy_strategy_duplicates_dependency_content() {
        let temp = tempfile::tempdir().unwrap();
        let cache_a = temp.path().join("cache-a");
        let cache_b = temp.path().join("cache-b");
        seed_tree(&cache_a, false);
        seed_tree(&cache_b, false);
        let workspace = temp.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();

        let config = Config::default();
        let mut reporter = RecordingReporter { events: Vec::new() };
        let mut installer =
            Installer::new(&config, &workspace, &mut reporter).with_strategy(LinkStrategy::Copy);
        installer
            .install(&resolution(vec![
                git_package("b", &cache_b, &[]),
                git_package("a", &cache_a, &["b"]),
            ]))
            .unwrap();

        let copied = workspace
            .join(".git-packages")
            .join("a")
            .join(CHILD_LINK_DIRNAME)
            .join("b");
        assert!(!fs::symlink_metadata(&copied).unwrap().file_type().is_symlink());
        assert!(copied.join("content.txt").exists());
    }

    #[test]
    fn test_existing_entries_are_replaced() {
        let temp = tempfile::tempdir().unwrap();
        let cache = temp.path().join("cache");
        seed_tree(&cache, false);
        let workspace = temp.path().join("workspace");
        let stale = workspace.join(".git-packages").join("pkg");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("stale.txt"), "old").unwrap();

        let config = Config::default();
        let mut reporter = RecordingReporter { events: Vec::new() };
        let mut installer = Installer::new(&config, &workspace, &mut reporter);
        installer
            .install(&resolution(vec![git_package("pkg", &cache, &[])]))
            .unwrap();

        assert!(!stale.join("stale.txt").exists());
        assert!(stale.join("content.txt").exists());
    }

    #[test]
    fn test_event_stream_shape() {
        let temp = tempfile::tempdir().unwrap();
        let cache = temp.path().join("cache");
        seed_tree(&cache, false);
        let workspace = temp.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();

        let config = Config::default();
        let mut reporter = RecordingReporter { events: Vec::new() };
        let mut installer = Installer::new(&config, &workspace, &mut reporter);
        installer
            .install(&resolution(vec![git_package("pkg", &cache, &[])]))
            .unwrap();

        assert_eq!(
            reporter.events,
            vec![
                InstallEvent::Installing { name: "pkg".into() },
                InstallEvent::Copied { name: "pkg".into() },
                InstallEvent::Summary {
                    installed: 1,
                    total: 1
                },
            ]
        );
    }

    #[test]
    fn test_empty_resolution_installs_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = temp.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();

        let config = Config::default();
        let mut reporter = RecordingReporter { events: Vec::new() };
        let mut installer = Installer::new(&config, &workspace, &mut reporter);
        let installed = installer.install(&resolution(vec![])).unwrap();

        assert_eq!(installed, 0);
        assert!(workspace.join(".git-packages").exists());
    }
}
