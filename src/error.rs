//! Error handling types for the git-pm engine.
//!
//! Every fatal condition the engine can produce is a distinct variant with a
//! machine-readable kind tag and a stable process exit code. All variants
//! except `SymlinkUnsupported` propagate to the top of the invocation and
//! abort it; `SymlinkUnsupported` is handled inside the installer, which
//! downgrades the link strategy and keeps going.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for git-pm operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Manifest parsing error in {file}: {message}")]
    ManifestMalformed { file: String, message: String },

    #[error("Unknown configuration key: '{key}'")]
    UnknownConfigKey { key: String },

    #[error("Authentication failed for {repo}: {message}")]
    AuthFailed { repo: String, message: String },

    #[error("Ref {ref_type}:{ref_value} not found in {repo}")]
    RefNotFound {
        repo: String,
        ref_type: String,
        ref_value: String,
    },

    #[error("Network error for {repo}: {message}")]
    NetworkError { repo: String, message: String },

    #[error("Path '{path}' matched nothing in {repo} at {ref_value}")]
    SparsePathEmpty {
        repo: String,
        path: String,
        ref_value: String,
    },

    #[error("Circular dependency detected: {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    #[error("Package name collision: '{name}' is declared with conflicting sources")]
    PackageNameCollision { name: String },

    #[error("Symbolic links are unavailable; falling back to {fallback}")]
    SymlinkUnsupported { fallback: String },

    #[error("Write failure at {path}: {message}")]
    WriteFailure { path: PathBuf, message: String },

    #[error("Permission denied at {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Two packages resolve to the same workspace directory: '{name}'")]
    PathCollision { name: String },

    #[error("Package '{name}' is not in the manifest")]
    PackageNotInstalled { name: String },

    #[error("Local path for package '{name}' does not exist: {path}")]
    LocalPathMissing { name: String, path: PathBuf },

    #[error("Git command failed ({command}): {stderr}")]
    GitCommand { command: String, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Machine-readable kind tag, stable across releases.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Error::ManifestMalformed { .. } => "manifest_malformed",
            Error::UnknownConfigKey { .. } => "unknown_config_key",
            Error::AuthFailed { .. } => "auth_failed",
            Error::RefNotFound { .. } => "ref_not_found",
            Error::NetworkError { .. } => "network_error",
            Error::SparsePathEmpty { .. } => "sparse_path_empty",
            Error::CircularDependency { .. } => "circular_dependency",
            Error::PackageNameCollision { .. } => "package_name_collision",
            Error::SymlinkUnsupported { .. } => "symlink_unsupported",
            Error::WriteFailure { .. } => "write_failure",
            Error::PermissionDenied { .. } => "permission_denied",
            Error::PathCollision { .. } => "path_collision",
            Error::PackageNotInstalled { .. } => "package_not_installed",
            Error::LocalPathMissing { .. } => "local_path_missing",
            Error::GitCommand { .. } => "git_command",
            Error::Io(_) => "io",
            Error::Yaml(_) => "yaml",
        }
    }

    /// Process exit code for this error kind.
    ///
    /// Each fatal kind maps to a distinct non-zero code so scripts can
    /// distinguish failure classes without parsing messages.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ManifestMalformed { .. } => 2,
            Error::UnknownConfigKey { .. } => 3,
            Error::AuthFailed { .. } => 4,
            Error::RefNotFound { .. } => 5,
            Error::NetworkError { .. } => 6,
            Error::SparsePathEmpty { .. } => 7,
            Error::CircularDependency { .. } => 8,
            Error::PackageNameCollision { .. } => 9,
            Error::WriteFailure { .. } => 10,
            Error::PermissionDenied { .. } => 11,
            Error::PathCollision { .. } => 12,
            Error::PackageNotInstalled { .. } => 13,
            Error::LocalPathMissing { .. } => 14,
            // SymlinkUnsupported never aborts; the remaining kinds share the
            // general failure code.
            _ => exit_codes::ERROR,
        }
    }
}

/// Result type alias for git-pm operations
pub type Result<T> = std::result::Result<T, Error>;

/// Well-known process exit codes.
pub mod exit_codes {
    /// Successful completion.
    pub const SUCCESS: i32 = 0;
    /// General, unclassified failure.
    pub const ERROR: i32 = 1;
}
