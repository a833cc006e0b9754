//! # Configuration Resolution
//!
//! This module merges git-pm configuration from three sources, lowest
//! priority first:
//!
//! 1. Built-in defaults.
//! 2. The user-scope config file (`~/.git-pm/config.yaml`).
//! 3. The project-scope config file (`git-pm.config.yaml` in the workspace).
//!
//! Nested maps are merged key-wise; scalar conflicts are won by the later
//! source. A missing file is treated as empty and never produces an error;
//! the resolver does not touch the network.
//!
//! The recognized key set is closed: `packages_dir`, `cache_dir`,
//! `git_protocol.<host>`, `url_patterns.<host>`, and `azure_devops_pat`.
//! The `config` command uses `set_key`/`unset_key`/`get_key` to edit a
//! single scope and rejects anything outside that set.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Project-scope config filename, looked up in the workspace root.
pub const PROJECT_CONFIG_FILENAME: &str = "git-pm.config.yaml";

/// Directory under the user's home holding the user-scope config.
pub const USER_CONFIG_DIRNAME: &str = ".git-pm";

/// User-scope config filename inside [`USER_CONFIG_DIRNAME`].
pub const USER_CONFIG_FILENAME: &str = "config.yaml";

/// Raw, partially-specified configuration as read from one file.
///
/// Every field is optional so that a file may set only the keys it cares
/// about; merging happens over these partial layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub git_protocol: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub url_patterns: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_devops_pat: Option<String>,
}

/// The effective, frozen configuration used by one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Workspace install root, relative to the workspace unless absolute.
    pub packages_dir: PathBuf,
    /// Cache root for sparse checkouts.
    pub cache_dir: PathBuf,
    /// Per-host protocol preference (`ssh` or `https`).
    pub git_protocol: BTreeMap<String, String>,
    /// Per-host URL template overrides; `{path}` is substituted.
    pub url_patterns: BTreeMap<String, String>,
    /// Azure DevOps personal access token.
    pub azure_devops_pat: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            packages_dir: PathBuf::from(".git-packages"),
            cache_dir: default_cache_dir(),
            git_protocol: BTreeMap::new(),
            url_patterns: BTreeMap::new(),
            azure_devops_pat: String::new(),
        }
    }
}

/// Where effective config for a key came from, for `config --list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    User,
    Project,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::User => write!(f, "user"),
            ConfigSource::Project => write!(f, "project"),
        }
    }
}

/// Returns the default cache root directory.
///
/// Uses the platform-appropriate user cache directory
/// (e.g. `~/.cache/git-pm` on Linux), falling back to `.git-pm-cache` in
/// the current directory if the platform directory cannot be determined.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".git-pm-cache"))
        .join("git-pm")
}

/// Returns the user-scope config file path, if a home directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(USER_CONFIG_DIRNAME).join(USER_CONFIG_FILENAME))
}

/// Returns the project-scope config file path for a workspace.
pub fn project_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(PROJECT_CONFIG_FILENAME)
}

/// Load a single config file layer.
///
/// A missing file yields the empty layer; a malformed file is an error.
pub fn load_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let text = fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    // A comments-only document deserializes as null, hence the Option.
    let file: Option<ConfigFile> =
        serde_yaml::from_str(&text).map_err(|e| Error::ManifestMalformed {
            file: path.display().to_string(),
            message: e.to_string(),
        })?;
    Ok(file.unwrap_or_default())
}

/// Write a single config file layer, creating parent directories.
pub fn save_file(path: &Path, file: &ConfigFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = serde_yaml::to_string(file)?;
    fs::write(path, text)?;
    Ok(())
}

/// Merge defaults, the user layer, and the project layer into the
/// effective configuration for a workspace.
pub fn load(workspace_root: &Path) -> Result<Config> {
    let user = match user_config_path() {
        Some(path) => load_file(&path)?,
        None => ConfigFile::default(),
    };
    let project = load_file(&project_config_path(workspace_root))?;
    Ok(merge(&user, &project).0)
}

/// Like [`load`], but also returns the source of every effective key for
/// `config --list`.
pub fn load_with_sources(workspace_root: &Path) -> Result<(Config, Vec<(String, String, ConfigSource)>)> {
    let user = match user_config_path() {
        Some(path) => load_file(&path)?,
        None => ConfigFile::default(),
    };
    let project = load_file(&project_config_path(workspace_root))?;
    let (config, sources) = merge(&user, &project);
    Ok((config, sources))
}

/// Deep-merge the two file layers over built-in defaults.
///
/// Scalars are replaced by the later layer; the `git_protocol` and
/// `url_patterns` maps are merged key-wise.
fn merge(user: &ConfigFile, project: &ConfigFile) -> (Config, Vec<(String, String, ConfigSource)>) {
    let mut config = Config::default();
    let mut sources: Vec<(String, String, ConfigSource)> = Vec::new();

    let mut packages_source = ConfigSource::Default;
    let mut cache_source = ConfigSource::Default;
    let mut pat_source = ConfigSource::Default;

    for (layer, source) in [(user, ConfigSource::User), (project, ConfigSource::Project)] {
        if let Some(dir) = &layer.packages_dir {
            config.packages_dir = PathBuf::from(dir);
            packages_source = source;
        }
        if let Some(dir) = &layer.cache_dir {
            config.cache_dir = expand_home(dir);
            cache_source = source;
        }
        if let Some(pat) = &layer.azure_devops_pat {
            config.azure_devops_pat = pat.clone();
            pat_source = source;
        }
        for (host, protocol) in &layer.git_protocol {
            config.git_protocol.insert(host.clone(), protocol.clone());
            upsert_source(&mut sources, format!("git_protocol.{host}"), protocol.clone(), source);
        }
        for (host, pattern) in &layer.url_patterns {
            config.url_patterns.insert(host.clone(), pattern.clone());
            upsert_source(&mut sources, format!("url_patterns.{host}"), pattern.clone(), source);
        }
    }

    sources.insert(
        0,
        (
            "packages_dir".to_string(),
            config.packages_dir.display().to_string(),
            packages_source,
        ),
    );
    sources.insert(
        1,
        (
            "cache_dir".to_string(),
            config.cache_dir.display().to_string(),
            cache_source,
        ),
    );
    sources.push((
        "azure_devops_pat".to_string(),
        config.azure_devops_pat.clone(),
        pat_source,
    ));

    (config, sources)
}

fn upsert_source(
    sources: &mut Vec<(String, String, ConfigSource)>,
    key: String,
    value: String,
    source: ConfigSource,
) {
    if let Some(entry) = sources.iter_mut().find(|(k, _, _)| *k == key) {
        entry.1 = value;
        entry.2 = source;
    } else {
        sources.push((key, value, source));
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Recognized scalar keys, used by the `config` command for validation.
const SCALAR_KEYS: &[&str] = &["packages_dir", "cache_dir", "azure_devops_pat"];

/// Recognized map keys addressable as `<key>.<host>`.
const MAP_KEYS: &[&str] = &["git_protocol", "url_patterns"];

/// Split a dotted key into a recognized `(section, host)` pair, or return
/// the scalar key name. Rejects everything outside the closed key set.
fn classify_key(key: &str) -> Result<(&str, Option<&str>)> {
    if SCALAR_KEYS.contains(&key) {
        return Ok((key, None));
    }
    if let Some((section, host)) = key.split_once('.') {
        if MAP_KEYS.contains(&section) && !host.is_empty() {
            return Ok((section, Some(host)));
        }
    }
    Err(Error::UnknownConfigKey { key: key.to_string() })
}

/// Read a single key from one config file layer. `None` means unset.
pub fn get_key(file: &ConfigFile, key: &str) -> Result<Option<String>> {
    Ok(match classify_key(key)? {
        ("packages_dir", None) => file.packages_dir.clone(),
        ("cache_dir", None) => file.cache_dir.clone(),
        ("azure_devops_pat", None) => file.azure_devops_pat.clone(),
        ("git_protocol", Some(host)) => file.git_protocol.get(host).cloned(),
        ("url_patterns", Some(host)) => file.url_patterns.get(host).cloned(),
        _ => unreachable!("classify_key admits only recognized keys"),
    })
}

/// Set a single key in one config file layer.
pub fn set_key(file: &mut ConfigFile, key: &str, value: &str) -> Result<()> {
    match classify_key(key)? {
        ("packages_dir", None) => file.packages_dir = Some(value.to_string()),
        ("cache_dir", None) => file.cache_dir = Some(value.to_string()),
        ("azure_devops_pat", None) => file.azure_devops_pat = Some(value.to_string()),
        ("git_protocol", Some(host)) => {
            if value != "ssh" && value != "https" {
                return Err(Error::UnknownConfigKey {
                    key: format!("{key}={value} (expected 'ssh' or 'https')"),
                });
            }
            file.git_protocol.insert(host.to_string(), value.to_string());
        }
        ("url_patterns", Some(host)) => {
            file.url_patterns.insert(host.to_string(), value.to_string());
        }
        _ => unreachable!("classify_key admits only recognized keys"),
    }
    Ok(())
}

/// Unset a single key in one config file layer. Returns whether the key
/// was previously set.
pub fn unset_key(file: &mut ConfigFile, key: &str) -> Result<bool> {
    Ok(match classify_key(key)? {
        ("packages_dir", None) => file.packages_dir.take().is_some(),
        ("cache_dir", None) => file.cache_dir.take().is_some(),
        ("azure_devops_pat", None) => file.azure_devops_pat.take().is_some(),
        ("git_protocol", Some(host)) => file.git_protocol.remove(host).is_some(),
        ("url_patterns", Some(host)) => file.url_patterns.remove(host).is_some(),
        _ => unreachable!("classify_key admits only recognized keys"),
    })
}
