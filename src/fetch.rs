//! # Content-Addressed Checkout Cache
//!
//! This module provides the fetcher: given `(repo, path, ref)` it ensures a
//! sparse checkout of `path` at `ref` exists in the cache and returns its
//! location and resolved commit.
//!
//! ## Cache layout
//!
//! ```text
//! <cache_dir>/
//!   <cache_key>/
//!     meta.yaml     resolved-commit sidecar
//!     repo/         the sparse checkout (its .git included)
//! ```
//!
//! The cache key is a 16-hex-character SHA-256 prefix over
//! `(repo, path, ref_type, ref_value)` computed against the *resolved*
//! reference: a branch is first pinned to a commit, so the same branch at
//! two different head commits produces two cache entries, and the entry is
//! shared with an explicit commit reference to the same subtree.
//!
//! ## Ref-type semantics
//!
//! - `commit`: the entry is permanent and reusable without remote contact.
//! - `tag`: permanent once populated; the name-to-commit mapping is
//!   treated as fixed (a force-moved tag yields a stale hit, accepted
//!   under the explicit-versions design).
//! - `branch`: re-resolved each invocation via one `ls-remote` per
//!   distinct `(repo, branch)` pair, memoized in the fetcher; the
//!   per-commit entries it produces are permanent.
//!
//! Subprocess execution sits behind the [`GitBackend`] trait so resolution
//! and cache behavior are testable without a network or a git binary.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::git;
use crate::manifest::Ref;
use crate::urls::{self, AuthEnv, RepoId, ResolvedUrl};

/// Sidecar filename recording the resolved commit of a cache entry.
pub const META_FILENAME: &str = "meta.yaml";

/// Directory name of the sparse checkout within a cache entry.
pub const CHECKOUT_DIRNAME: &str = "repo";

/// Metadata sidecar of one cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub repo: String,
    pub path: String,
    pub ref_type: String,
    pub ref_value: String,
    pub resolved_commit: String,
}

/// The outcome of `ensure_checkout`: where the requested subtree lives and
/// which commit it is.
#[derive(Debug, Clone)]
pub struct CheckoutHandle {
    /// Absolute path of the cached sparse subtree (`repo/<path>`).
    pub local_dir: PathBuf,
    /// The concrete commit the checkout produced.
    pub resolved_commit: String,
    /// The cache key of the entry.
    pub cache_key: String,
}

/// Git operations the fetcher needs from the outside world.
/// The default implementation shells out to the `git` binary; tests
/// substitute mocks.
pub trait GitBackend {
    /// Resolve a branch head to a commit SHA; `Ok(None)` when the remote
    /// answers but the branch does not exist.
    fn ls_remote_branch(
        &self,
        url: &ResolvedUrl,
        repo: &RepoId,
        branch: &str,
    ) -> Result<Option<String>>;

    /// Populate a sparse checkout of `path` at `reference` under `dest`,
    /// returning the commit SHA it landed on.
    fn sparse_checkout(
        &self,
        url: &ResolvedUrl,
        repo: &RepoId,
        reference: &Ref,
        path: &str,
        dest: &Path,
    ) -> Result<String>;
}

/// Default backend invoking the `git` binary.
pub struct SubprocessGit;

impl GitBackend for SubprocessGit {
    fn ls_remote_branch(
        &self,
        url: &ResolvedUrl,
        repo: &RepoId,
        branch: &str,
    ) -> Result<Option<String>> {
        git::ls_remote_branch(url, repo, branch)
    }

    fn sparse_checkout(
        &self,
        url: &ResolvedUrl,
        repo: &RepoId,
        reference: &Ref,
        path: &str,
        dest: &Path,
    ) -> Result<String> {
        git::sparse_checkout(url, repo, reference, path, dest)
    }
}

/// Compute the cache key for a `(repo, path, ref)` tuple.
///
/// Callers pass the *resolved* reference (branches already pinned).
pub fn cache_key(repo: &RepoId, path: &str, reference: &Ref) -> String {
    let canonical = format!("{}#{}:{}#{}", repo, reference.kind(), reference.value(), path);
    let digest = Sha256::digest(canonical.as_bytes());
    digest
        .iter()
        .take(8)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Fetches and caches sparse checkouts for one invocation.
pub struct Fetcher {
    config: Config,
    auth: AuthEnv,
    workspace_root: PathBuf,
    backend: Box<dyn GitBackend>,
    branch_pins: HashMap<(String, String), String>,
}

impl Fetcher {
    pub fn new(config: Config, auth: AuthEnv, workspace_root: PathBuf) -> Self {
        Self::with_backend(config, auth, workspace_root, Box::new(SubprocessGit))
    }

    /// Create a fetcher with a custom git backend (tests, embedders).
    pub fn with_backend(
        config: Config,
        auth: AuthEnv,
        workspace_root: PathBuf,
        backend: Box<dyn GitBackend>,
    ) -> Self {
        Self {
            config,
            auth,
            workspace_root,
            backend,
            branch_pins: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve a branch to its current head commit, memoized so every
    /// later reference to the same `(repo, branch)` observes the same
    /// commit and no second `ls-remote` runs.
    pub fn resolve_branch(&mut self, repo: &RepoId, branch: &str) -> Result<String> {
        let key = (repo.as_str().to_string(), branch.to_string());
        if let Some(sha) = self.branch_pins.get(&key) {
            return Ok(sha.clone());
        }

        let url = urls::resolve(repo, &self.config, &self.auth, &self.workspace_root);
        info!("Resolving branch {branch} of {repo}");
        let sha = self
            .backend
            .ls_remote_branch(&url, repo, branch)?
            .ok_or_else(|| Error::RefNotFound {
                repo: repo.to_string(),
                ref_type: "branch".to_string(),
                ref_value: branch.to_string(),
            })?;
        debug!("Pinned {repo}@{branch} to {sha}");
        self.branch_pins.insert(key, sha.clone());
        Ok(sha)
    }

    /// Pin a reference: branches become commits, everything else passes
    /// through unchanged.
    pub fn pin(&mut self, repo: &RepoId, reference: &Ref) -> Result<Ref> {
        match reference {
            Ref::Branch(branch) => Ok(Ref::Commit(self.resolve_branch(repo, branch)?)),
            other => Ok(other.clone()),
        }
    }

    /// Ensure a sparse checkout of `path` at `reference` exists in the
    /// cache, returning its location and resolved commit.
    pub fn ensure_checkout(
        &mut self,
        repo: &RepoId,
        path: &str,
        reference: &Ref,
    ) -> Result<CheckoutHandle> {
        let pinned = self.pin(repo, reference)?;
        let key = cache_key(repo, path, &pinned);
        let entry_dir = self.config.cache_dir.join(&key);
        let checkout_dir = entry_dir.join(CHECKOUT_DIRNAME);
        let meta_path = entry_dir.join(META_FILENAME);
        let subtree = if path.is_empty() {
            checkout_dir.clone()
        } else {
            checkout_dir.join(path)
        };

        if meta_path.exists() {
            let meta: CacheMeta = serde_yaml::from_str(&fs::read_to_string(&meta_path)?)?;
            let commit_matches = match &pinned {
                // Manifest commit refs may be abbreviated.
                Ref::Commit(sha) => meta.resolved_commit.starts_with(sha.as_str()),
                _ => true,
            };
            if commit_matches && subtree.exists() {
                debug!("Cache hit for {repo} ({pinned}) at {key}");
                return Ok(CheckoutHandle {
                    local_dir: subtree,
                    resolved_commit: meta.resolved_commit,
                    cache_key: key,
                });
            }
        }

        let url = urls::resolve(repo, &self.config, &self.auth, &self.workspace_root);
        info!("Fetching {repo} ({pinned}) into cache entry {key}");
        let resolved_commit = self
            .backend
            .sparse_checkout(&url, repo, &pinned, path, &checkout_dir)?;

        if !subtree.exists() {
            let _ = fs::remove_dir_all(&entry_dir);
            return Err(Error::SparsePathEmpty {
                repo: repo.to_string(),
                path: path.to_string(),
                ref_value: pinned.value().to_string(),
            });
        }

        let meta = CacheMeta {
            repo: repo.as_str().to_string(),
            path: path.to_string(),
            ref_type: pinned.kind().to_string(),
            ref_value: pinned.value().to_string(),
            resolved_commit: resolved_commit.clone(),
        };
        fs::write(&meta_path, serde_yaml::to_string(&meta)?)?;

        Ok(CheckoutHandle {
            local_dir: subtree,
            resolved_commit,
            cache_key: key,
        })
    }
}
