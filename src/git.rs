//! Git subprocess invocation.
//!
//! Everything that shells out to the `git` binary lives here: branch
//! resolution via `ls-remote` and the sparse-checkout population sequence
//! (init, remote, sparse pattern, fetch, checkout, rev-parse). Stderr from
//! failed remote operations is classified into the engine's error kinds.
//!
//! Authentication extra-headers are applied per command with
//! `-c http.extraHeader=…` and are never written into the repository
//! configuration of a cache entry.

use std::fs;
use std::path::Path;
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};
use crate::manifest::Ref;
use crate::urls::{RepoId, ResolvedUrl};

/// Run git with the given arguments, returning stdout on success.
fn run_git(args: &[String], cwd: Option<&Path>) -> std::result::Result<String, String> {
    debug!("git {}", args.join(" "));
    let mut command = Command::new("git");
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    let output = command.output().map_err(|e| e.to_string())?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).into_owned())
    }
}

/// Like [`run_git`], for local-only operations where failure is a plain
/// subprocess error rather than a remote condition.
fn run_local_git(args: &[String], cwd: &Path) -> Result<String> {
    run_git(args, Some(cwd)).map_err(|stderr| Error::GitCommand {
        command: format!("git {}", args.join(" ")),
        stderr: stderr.trim().to_string(),
    })
}

/// Per-command arguments carrying the auth extra-header, if any.
fn auth_args(url: &ResolvedUrl) -> Vec<String> {
    match &url.extra_header {
        Some(header) => vec!["-c".to_string(), format!("http.extraHeader={header}")],
        None => Vec::new(),
    }
}

/// Whether stderr from a failed remote operation indicates an
/// authentication problem rather than a transport problem.
///
/// An `ls-remote` that fails because the selected credentials cannot see
/// the repository is reported as `AuthFailed`, not `NetworkError`.
fn is_auth_failure(stderr: &str) -> bool {
    const MARKERS: &[&str] = &[
        "Authentication failed",
        "authentication failed",
        "could not read Username",
        "could not read Password",
        "Permission denied (publickey",
        "HTTP 401",
        "HTTP 403",
        "The requested URL returned error: 401",
        "The requested URL returned error: 403",
    ];
    MARKERS.iter().any(|marker| stderr.contains(marker))
}

/// Whether stderr indicates the requested ref does not exist remotely.
fn is_missing_ref(stderr: &str) -> bool {
    const MARKERS: &[&str] = &[
        "couldn't find remote ref",
        "not our ref",
        "bad object",
        "unknown revision",
        "pathspec",
    ];
    MARKERS.iter().any(|marker| stderr.contains(marker))
}

/// Classify a failed remote operation against a repository.
fn classify_remote_failure(repo: &RepoId, reference: &Ref, stderr: &str) -> Error {
    let message = stderr.trim().to_string();
    if is_auth_failure(&message) {
        Error::AuthFailed {
            repo: repo.to_string(),
            message,
        }
    } else if is_missing_ref(&message) {
        Error::RefNotFound {
            repo: repo.to_string(),
            ref_type: reference.kind().to_string(),
            ref_value: reference.value().to_string(),
        }
    } else {
        Error::NetworkError {
            repo: repo.to_string(),
            message,
        }
    }
}

/// Resolve a branch head to a commit SHA via `ls-remote`.
///
/// Returns `Ok(None)` when the remote answers but the branch does not
/// exist. This is the single permitted network round-trip per distinct
/// `(repo, branch)` pair; the fetcher memoizes the result.
pub fn ls_remote_branch(url: &ResolvedUrl, repo: &RepoId, branch: &str) -> Result<Option<String>> {
    let mut args = auth_args(url);
    args.extend([
        "ls-remote".to_string(),
        url.url.clone(),
        format!("refs/heads/{branch}"),
    ]);

    let stdout = run_git(&args, None)
        .map_err(|stderr| classify_remote_failure(repo, &Ref::Branch(branch.to_string()), &stderr))?;

    Ok(stdout
        .lines()
        .find_map(|line| line.split('\t').next())
        .filter(|sha| !sha.is_empty())
        .map(str::to_string))
}

/// Populate a sparse checkout of `path` at `reference` under `dest`.
///
/// `dest` becomes a git work tree whose sparse pattern is limited to the
/// requested subpath (the whole tree when `path` is empty). Returns the
/// commit SHA the checkout landed on. On failure the partially-populated
/// directory is removed so a retry starts clean.
pub fn sparse_checkout(
    url: &ResolvedUrl,
    repo: &RepoId,
    reference: &Ref,
    path: &str,
    dest: &Path,
) -> Result<String> {
    let result = sparse_checkout_inner(url, repo, reference, path, dest);
    if result.is_err() && dest.exists() {
        let _ = fs::remove_dir_all(dest);
    }
    result
}

fn sparse_checkout_inner(
    url: &ResolvedUrl,
    repo: &RepoId,
    reference: &Ref,
    path: &str,
    dest: &Path,
) -> Result<String> {
    fs::create_dir_all(dest)?;

    if dest.join(".git").is_dir() {
        run_local_git(
            &["remote".into(), "set-url".into(), "origin".into(), url.url.clone()],
            dest,
        )?;
    } else {
        run_local_git(&["init".into(), "--quiet".into()], dest)?;
        run_local_git(
            &["remote".into(), "add".into(), "origin".into(), url.url.clone()],
            dest,
        )?;
        run_local_git(
            &["config".into(), "core.sparseCheckout".into(), "true".into()],
            dest,
        )?;
    }

    let sparse_file = dest.join(".git").join("info").join("sparse-checkout");
    if let Some(parent) = sparse_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&sparse_file, format!("{path}/*\n"))?;

    let checkout_ref = fetch_reference(url, repo, reference, dest)?;

    let mut args = auth_args(url);
    args.extend(["checkout".to_string(), "--quiet".to_string(), checkout_ref]);
    run_git(&args, Some(dest)).map_err(|stderr| {
        // git refuses a checkout whose sparse pattern matches nothing.
        if stderr.contains("parse checkout leaves no entry") {
            Error::SparsePathEmpty {
                repo: repo.to_string(),
                path: path.to_string(),
                ref_value: reference.value().to_string(),
            }
        } else {
            classify_remote_failure(repo, reference, &stderr)
        }
    })?;

    rev_parse_head(dest)
}

/// Fetch the target reference, shallow first, falling back to a full fetch
/// for servers that refuse direct SHA or shallow fetches. Returns the ref
/// to check out.
fn fetch_reference(
    url: &ResolvedUrl,
    repo: &RepoId,
    reference: &Ref,
    dest: &Path,
) -> Result<String> {
    let (fetch_target, shallow_checkout, full_checkout) = match reference {
        Ref::Commit(sha) => (sha.clone(), sha.clone(), sha.clone()),
        Ref::Tag(tag) => (
            format!("refs/tags/{tag}"),
            "FETCH_HEAD".to_string(),
            format!("refs/tags/{tag}"),
        ),
        Ref::Branch(branch) => (
            branch.clone(),
            "FETCH_HEAD".to_string(),
            format!("origin/{branch}"),
        ),
    };

    let mut shallow = auth_args(url);
    shallow.extend([
        "fetch".to_string(),
        "--depth=1".to_string(),
        "origin".to_string(),
        fetch_target,
    ]);
    if run_git(&shallow, Some(dest)).is_ok() {
        return Ok(shallow_checkout);
    }

    let mut full = auth_args(url);
    full.extend([
        "fetch".to_string(),
        "--tags".to_string(),
        "origin".to_string(),
    ]);
    run_git(&full, Some(dest))
        .map_err(|stderr| classify_remote_failure(repo, reference, &stderr))?;
    Ok(full_checkout)
}

/// The commit SHA a work tree currently has checked out.
pub fn rev_parse_head(dir: &Path) -> Result<String> {
    let stdout = run_local_git(&["rev-parse".into(), "HEAD".into()], dir)?;
    Ok(stdout.trim().to_string())
}
