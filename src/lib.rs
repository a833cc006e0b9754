//! # git-pm Library
//!
//! This library provides the core functionality of the `git-pm` package
//! manager. It is designed to be used by the `git-pm` command-line tool but
//! can also be embedded in other applications that need to materialize git
//! repository subtrees into a workspace.
//!
//! ## Core Concepts
//!
//! The library is built around a few key concepts:
//!
//! - **Configuration (`config`)**: The effective configuration merged from
//!   built-in defaults, the user-scope config file, and the project-scope
//!   config file.
//! - **Manifest (`manifest`)**: The `git-pm.yaml` file declaring the packages
//!   a workspace depends on, plus the optional `git-pm.local.yaml` override
//!   file used during local development.
//! - **URL Resolution (`urls`)**: Mapping provider-agnostic repository
//!   identifiers (`github.com/owner/repo`, `dev.azure.com/org/project/repo`)
//!   to protocol- and authentication-specific fetch URLs.
//! - **Fetching (`fetch`, `git`)**: A content-addressed cache of sparse git
//!   checkouts keyed by `(repo, path, ref)`, populated via the `git` binary.
//! - **Resolution (`resolver`)**: Recursive discovery of nested manifests,
//!   branch pinning, cycle detection, and topological ordering.
//! - **Installation (`install`, `links`, `fsutil`)**: Materializing each
//!   package into the workspace and wiring per-package dependency links.
//! - **Workspace Maintenance (`workspace`)**: The generated `.git-pm.env`
//!   file, idempotent `.gitignore` management, and cascading removal.
//!
//! ## Execution Flow
//!
//! An `install` runs the following high-level steps:
//!
//! 1. **Configure**: Merge default, user, and project configuration.
//! 2. **Load**: Read the root manifest and apply local overrides.
//! 3. **Resolve**: Recursively discover nested dependencies, pinning each
//!    branch to a single commit for the whole invocation.
//! 4. **Install**: Materialize every package in topological order, then
//!    create the per-package child links.
//! 5. **Maintain**: Regenerate `.git-pm.env` and update `.gitignore`.

pub mod config;
pub mod error;
pub mod fetch;
pub mod fsutil;
pub mod git;
pub mod install;
pub mod links;
pub mod manifest;
pub mod resolver;
pub mod urls;
pub mod workspace;

pub use error::{exit_codes, Error, Result};
