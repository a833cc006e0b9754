//! # Manifest Schema and Parsing
//!
//! This module defines the data structures representing the `git-pm.yaml`
//! manifest and the optional `git-pm.local.yaml` override file, as well as
//! the parsing and editing logic used by the `install`, `add`, and `remove`
//! commands.
//!
//! ## File shape
//!
//! ```yaml
//! packages:
//!   terraform-modules:
//!     repo: dev.azure.com/org/Platform Engineering/tf-modules
//!     path: modules/network
//!     ref:
//!       type: tag
//!       value: v1.4.0
//!   shared-scripts:
//!     repo: github.com/org/shared-scripts
//!   dev-tool:
//!     type: local
//!     path: ../dev-tool
//! ```
//!
//! A missing `ref` defaults to `branch: main`; a missing `path` means the
//! repository root. The override file has the same shape; its entries
//! replace entire entries of the same name in the base manifest (no field
//! overlay) and may introduce names the base does not declare.
//!
//! ## Parsing
//!
//! Files deserialize into permissive raw structs first and are then
//! validated into the `Ref`/`PackageSource` sum types. The conversion
//! boundary is where "exactly one of tag/branch/commit", "repo required
//! for git sources", and "path required for local sources" are enforced.
//! Entry order is preserved; it is the tie-breaker for install ordering.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::urls::RepoId;

/// Root manifest filename at the workspace root (and inside packages, for
/// nested dependency declarations).
pub const MANIFEST_FILENAME: &str = "git-pm.yaml";

/// Local override filename at the workspace root; typically git-ignored.
pub const LOCAL_OVERRIDE_FILENAME: &str = "git-pm.local.yaml";

/// A git reference. `Tag` and `Commit` are immutable-like; `Branch` is
/// mutable and is *pinned* to a commit once per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ref {
    Tag(String),
    Branch(String),
    Commit(String),
}

impl Ref {
    /// The manifest-facing type name.
    pub fn kind(&self) -> &'static str {
        match self {
            Ref::Tag(_) => "tag",
            Ref::Branch(_) => "branch",
            Ref::Commit(_) => "commit",
        }
    }

    /// The tag name, branch name, or commit SHA.
    pub fn value(&self) -> &str {
        match self {
            Ref::Tag(v) | Ref::Branch(v) | Ref::Commit(v) => v,
        }
    }

    /// Whether the remote may move this reference between invocations.
    pub fn is_mutable(&self) -> bool {
        matches!(self, Ref::Branch(_))
    }
}

impl std::fmt::Display for Ref {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

/// Where a package's content comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageSource {
    /// A subtree of a remote git repository at a specific reference.
    Git {
        repo: RepoId,
        /// Subpath within the repository; empty means the repository root.
        path: String,
        reference: Ref,
    },
    /// A directory on the local filesystem, linked rather than fetched.
    Local { path: PathBuf },
}

/// One declared package: a workspace-unique name plus its source.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageSpec {
    pub name: String,
    pub source: PackageSource,
}

////// RAW SERDE TYPES //////

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRef {
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawPackage {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    reference: Option<RawRef>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    packages: Option<serde_yaml::Mapping>,
}

////// CONVERSION IMPLEMENTATIONS //////

fn malformed(file: &str, message: impl Into<String>) -> Error {
    Error::ManifestMalformed {
        file: file.to_string(),
        message: message.into(),
    }
}

/// A package name doubles as a workspace directory name, so path
/// separators and dot-names are rejected.
pub fn validate_package_name(name: &str, file: &str) -> Result<()> {
    if name.is_empty() {
        return Err(malformed(file, "package name must not be empty"));
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(malformed(
            file,
            format!("package name '{name}' is not usable as a directory name"),
        ));
    }
    Ok(())
}

fn convert_ref(raw: &RawRef, name: &str, file: &str) -> Result<Ref> {
    if raw.value.is_empty() {
        return Err(malformed(file, format!("package '{name}': ref value must not be empty")));
    }
    match raw.kind.as_str() {
        "tag" => Ok(Ref::Tag(raw.value.clone())),
        "branch" => Ok(Ref::Branch(raw.value.clone())),
        "commit" => Ok(Ref::Commit(raw.value.clone())),
        other => Err(malformed(
            file,
            format!("package '{name}': ref type must be tag, branch, or commit (got '{other}')"),
        )),
    }
}

fn convert_package(name: &str, raw: RawPackage, file: &str) -> Result<PackageSpec> {
    validate_package_name(name, file)?;

    match raw.kind.as_deref() {
        Some("local") => {
            if raw.repo.is_some() {
                return Err(malformed(
                    file,
                    format!("package '{name}': local packages must not declare 'repo'"),
                ));
            }
            if raw.reference.is_some() {
                return Err(malformed(
                    file,
                    format!("package '{name}': local packages must not declare 'ref'"),
                ));
            }
            let path = raw.path.filter(|p| !p.is_empty()).ok_or_else(|| {
                malformed(file, format!("package '{name}': local packages require 'path'"))
            })?;
            Ok(PackageSpec {
                name: name.to_string(),
                source: PackageSource::Local {
                    path: PathBuf::from(path),
                },
            })
        }
        Some(other) => Err(malformed(
            file,
            format!("package '{name}': unknown package type '{other}'"),
        )),
        None => {
            let repo = raw.repo.ok_or_else(|| {
                malformed(file, format!("package '{name}': missing 'repo'"))
            })?;
            let reference = match &raw.reference {
                Some(raw_ref) => convert_ref(raw_ref, name, file)?,
                None => Ref::Branch("main".to_string()),
            };
            Ok(PackageSpec {
                name: name.to_string(),
                source: PackageSource::Git {
                    repo: RepoId::new(&repo),
                    path: raw.path.unwrap_or_default(),
                    reference,
                },
            })
        }
    }
}

fn raw_from_spec(spec: &PackageSpec) -> RawPackage {
    match &spec.source {
        PackageSource::Git { repo, path, reference } => RawPackage {
            kind: None,
            repo: Some(repo.as_str().to_string()),
            path: (!path.is_empty()).then(|| path.clone()),
            reference: Some(RawRef {
                kind: reference.kind().to_string(),
                value: reference.value().to_string(),
            }),
        },
        PackageSource::Local { path } => RawPackage {
            kind: Some("local".to_string()),
            repo: None,
            path: Some(path.display().to_string()),
            reference: None,
        },
    }
}

/// An ordered set of package declarations.
///
/// Order is document order; it drives deterministic tie-breaking in the
/// topological install order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    packages: Vec<PackageSpec>,
}

impl Manifest {
    /// Parse manifest text. `file` labels error messages.
    pub fn parse(text: &str, file: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        // A comments-only document deserializes as null, hence the Option.
        let raw: Option<RawManifest> =
            serde_yaml::from_str(text).map_err(|e| malformed(file, e.to_string()))?;
        let raw = raw.unwrap_or_default();

        let mut packages = Vec::new();
        if let Some(mapping) = raw.packages {
            for (key, value) in mapping {
                let name = key
                    .as_str()
                    .ok_or_else(|| malformed(file, "package names must be strings"))?
                    .to_string();
                let raw_package: RawPackage = serde_yaml::from_value(value)
                    .map_err(|e| malformed(file, format!("package '{name}': {e}")))?;
                let spec = convert_package(&name, raw_package, file)?;
                if packages.iter().any(|existing: &PackageSpec| existing.name == spec.name) {
                    return Err(Error::PackageNameCollision { name: spec.name });
                }
                packages.push(spec);
            }
        }
        Ok(Self { packages })
    }

    /// Load a manifest file; a missing file is the empty manifest.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Serialize back to YAML, preserving entry order.
    pub fn to_yaml(&self) -> Result<String> {
        let mut mapping = serde_yaml::Mapping::new();
        for spec in &self.packages {
            mapping.insert(
                serde_yaml::Value::String(spec.name.clone()),
                serde_yaml::to_value(raw_from_spec(spec))?,
            );
        }
        let raw = RawManifest {
            packages: Some(mapping),
        };
        Ok(serde_yaml::to_string(&raw)?)
    }

    /// Write the manifest to disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// The declared packages in document order.
    pub fn packages(&self) -> &[PackageSpec] {
        &self.packages
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Look up a declaration by name.
    pub fn get(&self, name: &str) -> Option<&PackageSpec> {
        self.packages.iter().find(|spec| spec.name == name)
    }

    /// Whether a name is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert a declaration, replacing any existing entry of the same name
    /// in place (preserving its position). Returns whether an entry was
    /// replaced.
    pub fn upsert(&mut self, spec: PackageSpec) -> bool {
        if let Some(existing) = self.packages.iter_mut().find(|p| p.name == spec.name) {
            *existing = spec;
            true
        } else {
            self.packages.push(spec);
            false
        }
    }

    /// Remove a declaration by name. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.packages.len();
        self.packages.retain(|spec| spec.name != name);
        self.packages.len() != before
    }

    /// Apply a local override set: entries replace whole same-name entries
    /// and unknown names are appended.
    pub fn apply_overrides(&mut self, overrides: &Manifest) {
        for spec in &overrides.packages {
            self.upsert(spec.clone());
        }
    }
}

/// The root manifest and override file of one workspace.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceManifests {
    pub root: Manifest,
    pub overrides: Manifest,
}

impl WorkspaceManifests {
    /// Load `git-pm.yaml` and `git-pm.local.yaml` from a workspace root.
    /// Missing files load as empty manifests.
    pub fn load(workspace_root: &Path) -> Result<Self> {
        Ok(Self {
            root: Manifest::load(&workspace_root.join(MANIFEST_FILENAME))?,
            overrides: Manifest::load(&workspace_root.join(LOCAL_OVERRIDE_FILENAME))?,
        })
    }

    /// The effective root package set: the root manifest with overrides
    /// applied.
    pub fn effective(&self) -> Manifest {
        let mut effective = self.root.clone();
        effective.apply_overrides(&self.overrides);
        effective
    }
}
