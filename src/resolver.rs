//! # Recursive Dependency Resolution
//!
//! Starting from the effective root package set, this module discovers the
//! full dependency graph: each materialized package may carry its own
//! `git-pm.yaml` declaring nested dependencies, which are discovered
//! recursively, deduplicated by name, and checked for cycles.
//!
//! ## Branch pinning
//!
//! A branch name is resolved to a commit exactly once per `(repo, branch)`
//! pair per invocation (the fetcher memoizes the `ls-remote`), and that
//! commit is reused for every reference to the branch across the graph.
//! The resolved set therefore never contains a branch reference.
//!
//! ## Local overrides
//!
//! Before any remote access for a name, the root workspace's local
//! override set is consulted; a covered name uses the override's source
//! directly, so overriding a package to a local directory short-circuits
//! the network entirely for it.
//!
//! ## Ordering
//!
//! The install order is a post-order depth-first traversal: every package
//! is emitted after all of its direct dependencies, with ties broken by
//! the order names appear in their parent's manifest.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::manifest::{Manifest, PackageSource, PackageSpec, Ref, MANIFEST_FILENAME};

/// Sentinel commit value for packages materialized from a local directory.
pub const LOCAL_COMMIT: &str = "local";

/// The frozen outcome of discovery for one package.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub name: String,
    pub source: PackageSource,
    /// Never a branch: branches are pinned during discovery.
    pub resolved_ref: Ref,
    /// The pre-resolution reference, kept for reporting.
    pub original_ref: Ref,
    /// Concrete commit of the checkout, or [`LOCAL_COMMIT`].
    pub commit_sha: String,
    /// Cache entry key; `None` for local packages.
    pub cache_key: Option<String>,
    /// First-level dependency names, in manifest order.
    pub direct_deps: Vec<String>,
    /// Absolute path of the materialized subtree.
    pub materialized_path: PathBuf,
}

/// The resolved package set plus its topological install order.
///
/// Packages refer to each other only by name; the single owning map keeps
/// the graph cycle-safe and trivially serializable.
#[derive(Debug, Default)]
pub struct Resolution {
    packages: HashMap<String, ResolvedPackage>,
    order: Vec<String>,
}

impl Resolution {
    pub fn get(&self, name: &str) -> Option<&ResolvedPackage> {
        self.packages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Package names in install order (dependencies first).
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Packages in install order.
    pub fn in_order(&self) -> impl Iterator<Item = &ResolvedPackage> {
        self.order.iter().filter_map(|name| self.packages.get(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        packages: HashMap<String, ResolvedPackage>,
        order: Vec<String>,
    ) -> Self {
        Self { packages, order }
    }
}

/// Drives discovery for one invocation.
pub struct Resolver<'a> {
    fetcher: &'a mut Fetcher,
    workspace_root: PathBuf,
    overrides: Manifest,
    resolve_deps: bool,
    resolved: HashMap<String, ResolvedPackage>,
}

impl<'a> Resolver<'a> {
    pub fn new(fetcher: &'a mut Fetcher, workspace_root: &Path, overrides: Manifest) -> Self {
        Self {
            fetcher,
            workspace_root: workspace_root.to_path_buf(),
            overrides,
            resolve_deps: true,
            resolved: HashMap::new(),
        }
    }

    /// Disable recursion: only the direct root entries are resolved and no
    /// nested manifest is read, so `direct_deps` stays empty.
    pub fn without_dep_resolution(mut self) -> Self {
        self.resolve_deps = false;
        self
    }

    /// Discover the full graph reachable from `roots` and compute the
    /// install order.
    pub fn resolve(mut self, roots: &Manifest) -> Result<Resolution> {
        let mut chain = Vec::new();
        for spec in roots.packages() {
            self.discover(spec, &mut chain)?;
        }

        let order = self.topological_order(roots)?;
        Ok(Resolution {
            packages: self.resolved,
            order,
        })
    }

    fn discover(&mut self, spec: &PackageSpec, chain: &mut Vec<String>) -> Result<()> {
        if chain.iter().any(|name| name == &spec.name) {
            let mut cycle = chain.clone();
            cycle.push(spec.name.clone());
            return Err(Error::CircularDependency { chain: cycle });
        }

        // Local overrides take effect before any remote access.
        let effective = match self.overrides.get(&spec.name) {
            Some(override_spec) => {
                debug!("Override: {} -> local declaration", spec.name);
                override_spec.clone()
            }
            None => spec.clone(),
        };

        if let Some(existing) = self.resolved.get(&effective.name) {
            if existing.source != effective.source {
                return Err(Error::PackageNameCollision {
                    name: effective.name,
                });
            }
            return Ok(());
        }

        let mut package = self.materialize(&effective)?;
        let nested = if self.resolve_deps {
            Manifest::load(&package.materialized_path.join(MANIFEST_FILENAME))?
        } else {
            Manifest::default()
        };
        package.direct_deps = nested
            .packages()
            .iter()
            .map(|nested_spec| nested_spec.name.clone())
            .collect();
        debug!(
            "Resolved {} at {} ({} direct deps)",
            package.name,
            package.commit_sha,
            package.direct_deps.len()
        );

        self.resolved.insert(package.name.clone(), package);

        chain.push(effective.name.clone());
        for nested_spec in nested.packages() {
            self.discover(nested_spec, chain)?;
        }
        chain.pop();

        Ok(())
    }

    /// Fetch or locate the package content and freeze its resolution.
    fn materialize(&mut self, spec: &PackageSpec) -> Result<ResolvedPackage> {
        match &spec.source {
            PackageSource::Local { path } => {
                let absolute = if path.is_absolute() {
                    path.clone()
                } else {
                    self.workspace_root.join(path)
                };
                if !absolute.exists() {
                    return Err(Error::LocalPathMissing {
                        name: spec.name.clone(),
                        path: absolute,
                    });
                }
                Ok(ResolvedPackage {
                    name: spec.name.clone(),
                    source: spec.source.clone(),
                    resolved_ref: Ref::Commit(LOCAL_COMMIT.to_string()),
                    original_ref: Ref::Commit(LOCAL_COMMIT.to_string()),
                    commit_sha: LOCAL_COMMIT.to_string(),
                    cache_key: None,
                    direct_deps: Vec::new(),
                    materialized_path: absolute,
                })
            }
            PackageSource::Git {
                repo,
                path,
                reference,
            } => {
                let pinned = self.fetcher.pin(repo, reference)?;
                let handle = self.fetcher.ensure_checkout(repo, path, &pinned)?;
                Ok(ResolvedPackage {
                    name: spec.name.clone(),
                    source: spec.source.clone(),
                    resolved_ref: pinned,
                    original_ref: reference.clone(),
                    commit_sha: handle.resolved_commit,
                    cache_key: Some(handle.cache_key),
                    direct_deps: Vec::new(),
                    materialized_path: handle.local_dir,
                })
            }
        }
    }

    /// Post-order depth-first traversal over the resolved set, roots and
    /// dependencies both visited in manifest order. Cycles are already
    /// fatal during discovery; the temp-mark set guards this traversal
    /// independently.
    fn topological_order(&self, roots: &Manifest) -> Result<Vec<String>> {
        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut marked = HashSet::new();
        for spec in roots.packages() {
            self.visit(&spec.name, &mut marked, &mut done, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        name: &str,
        marked: &mut HashSet<String>,
        done: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if !marked.insert(name.to_string()) {
            return Err(Error::CircularDependency {
                chain: vec![name.to_string()],
            });
        }
        let Some(package) = self.resolved.get(name) else {
            return Ok(());
        };
        for dep in &package.direct_deps {
            self.visit(dep, marked, done, order)?;
        }
        marked.remove(name);
        done.insert(name.to_string());
        order.push(name.to_string());
        Ok(())
    }
}
