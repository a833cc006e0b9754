//! Shared test utilities for the end-to-end tests.
//!
//! Provides a workspace fixture with an isolated HOME (so user-scope
//! config and the checkout cache never leak between tests or from the
//! developer's machine) plus helpers for building real git repositories
//! served over `file://` URLs.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_manifest("packages:\n");
//!     fixture.command().arg("install").assert().success();
//! }
//! ```

use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;

use assert_cmd::Command;
use assert_fs::prelude::*;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use super::{git, TestFixture};
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;
}

/// Run a git command in `dir`, panicking on failure.
#[allow(dead_code)]
pub fn git(dir: &Path, args: &[&str]) {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A temporary workspace plus an isolated HOME directory.
pub struct TestFixture {
    workspace: assert_fs::TempDir,
    home: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        Self {
            workspace: assert_fs::TempDir::new().unwrap(),
            home: assert_fs::TempDir::new().unwrap(),
        }
    }

    /// The workspace root the CLI runs in.
    pub fn path(&self) -> &Path {
        self.workspace.path()
    }

    /// A scratch directory outside the workspace (lives under the
    /// isolated HOME).
    pub fn scratch(&self) -> &Path {
        self.home.path()
    }

    /// Write the root `git-pm.yaml`.
    pub fn with_manifest(self, text: &str) -> Self {
        self.workspace.child("git-pm.yaml").write_str(text).unwrap();
        self
    }

    /// Write the local override `git-pm.local.yaml`.
    pub fn with_local_override(self, text: &str) -> Self {
        self.workspace
            .child("git-pm.local.yaml")
            .write_str(text)
            .unwrap();
        self
    }

    /// Write an arbitrary file into the workspace.
    pub fn with_file(self, relative: &str, content: &str) -> Self {
        self.workspace.child(relative).write_str(content).unwrap();
        self
    }

    /// A `git-pm` command prepared with the workspace as its working
    /// directory and HOME/cache redirected into the fixture.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("git-pm").unwrap();
        cmd.current_dir(self.workspace.path())
            .env("HOME", self.home.path())
            .env("XDG_CACHE_HOME", self.home.path().join("cache"))
            .env_remove("AZURE_DEVOPS_PAT")
            .env_remove("SYSTEM_ACCESSTOKEN");
        cmd
    }

    /// Read a workspace file to a string.
    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.workspace.path().join(relative)).unwrap()
    }

    /// Whether a workspace path exists.
    pub fn exists(&self, relative: &str) -> bool {
        self.workspace.path().join(relative).exists()
    }

    /// Create a plain local directory (not a git repo) under the fixture
    /// scratch area, with the given files.
    pub fn local_dir(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.home.path().join("local").join(name);
        for (relative, content) in files {
            let file = dir.join(relative);
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(file, content).unwrap();
        }
        if files.is_empty() {
            std::fs::create_dir_all(&dir).unwrap();
        }
        dir
    }

    /// Create a real git repository under the fixture scratch area with
    /// the given files committed on `main`, optionally tagged. Returns
    /// the repository path; use [`file_url`] to reference it.
    pub fn git_repo(&self, name: &str, files: &[(&str, &str)], tag: Option<&str>) -> PathBuf {
        let dir = self.home.path().join("repos").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        git(&dir, &["init", "--quiet"]);
        git(&dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&dir, &["config", "user.email", "test@test.invalid"]);
        git(&dir, &["config", "user.name", "Test User"]);
        for (relative, content) in files {
            let file = dir.join(relative);
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(file, content).unwrap();
        }
        git(&dir, &["add", "-A"]);
        git(&dir, &["commit", "--quiet", "-m", "initial"]);
        if let Some(tag) = tag {
            git(&dir, &["tag", tag]);
        }
        dir
    }

    /// Add a commit to an existing fixture repository.
    pub fn commit_file(&self, repo: &Path, relative: &str, content: &str) {
        let file = repo.join(relative);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(file, content).unwrap();
        git(repo, &["add", "-A"]);
        git(repo, &["commit", "--quiet", "-m", "update"]);
    }
}

/// A `file://` URL for a fixture repository path.
#[allow(dead_code)]
pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}
