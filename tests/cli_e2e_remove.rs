//! End-to-end tests for the `remove` command and its cascading behavior.

mod common;

use common::prelude::*;
use common::file_url;

/// Build the S5 graph: roots {a, c}, a -> b -> d, c -> d.
fn s5_fixture() -> TestFixture {
    let fixture = TestFixture::new();
    let repo_d = fixture.git_repo("repo-d", &[("d.txt", "D")], Some("v1"));
    let needs_d = format!(
        "packages:\n  d:\n    repo: {}\n    ref:\n      type: tag\n      value: v1\n",
        file_url(&repo_d)
    );
    let repo_b = fixture.git_repo(
        "repo-b",
        &[("b.txt", "B"), ("git-pm.yaml", &needs_d)],
        Some("v1"),
    );
    let needs_b = format!(
        "packages:\n  b:\n    repo: {}\n    ref:\n      type: tag\n      value: v1\n",
        file_url(&repo_b)
    );
    let repo_a = fixture.git_repo(
        "repo-a",
        &[("a.txt", "A"), ("git-pm.yaml", &needs_b)],
        Some("v1"),
    );
    let repo_c = fixture.git_repo(
        "repo-c",
        &[("c.txt", "C"), ("git-pm.yaml", &needs_d)],
        Some("v1"),
    );

    fixture.with_manifest(&format!(
        "packages:\n  a:\n    repo: {}\n    ref:\n      type: tag\n      value: v1\n  c:\n    repo: {}\n    ref:\n      type: tag\n      value: v1\n",
        file_url(&repo_a),
        file_url(&repo_c)
    ))
}

/// S5: removing c keeps d (still required via a -> b); removing a then
/// empties the workspace.
#[test]
fn test_remove_cascade() {
    let fixture = s5_fixture();
    fixture
        .command()
        .args(["install", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed 4 package(s)"));

    fixture
        .command()
        .args(["remove", "c", "-y"])
        .assert()
        .success();
    assert!(fixture.exists(".git-packages/a"));
    assert!(fixture.exists(".git-packages/b"));
    assert!(fixture.exists(".git-packages/d"));
    assert!(!fixture.exists(".git-packages/c"));
    // b's child link to d survives.
    assert!(fixture.exists(".git-packages/b/.git-packages/d"));

    fixture
        .command()
        .args(["remove", "a", "-y"])
        .assert()
        .success();
    for name in ["a", "b", "c", "d"] {
        assert!(
            !fixture.exists(&format!(".git-packages/{name}")),
            "{name} should be gone"
        );
    }

    // The environment file was regenerated without package variables.
    let env = fixture.read(".git-pm.env");
    assert!(!env.contains("GIT_PM_PACKAGE_"));
}

/// The manifest entry disappears with the installed directory.
#[test]
fn test_remove_edits_manifest() {
    let fixture = s5_fixture();
    fixture
        .command()
        .args(["install", "--quiet"])
        .assert()
        .success();

    fixture
        .command()
        .args(["remove", "c", "-y"])
        .assert()
        .success();
    let manifest = fixture.read("git-pm.yaml");
    assert!(!manifest.contains("c:"));
    assert!(manifest.contains("a:"));
}

/// Removing an undeclared package exits non-zero with its own code.
#[test]
fn test_remove_unknown_package_fails() {
    let fixture = TestFixture::new().with_manifest("packages:\n");
    fixture
        .command()
        .args(["remove", "ghost", "-y"])
        .assert()
        .failure()
        .code(13)
        .stderr(predicate::str::contains("package_not_installed"));
}

/// A package declared only in the local override can be removed; the
/// override file is rewritten.
#[test]
fn test_remove_override_entry() {
    let fixture = TestFixture::new();
    let local = fixture.local_dir("dev-pkg", &[("x.txt", "x")]);
    let fixture = fixture
        .with_manifest("packages:\n")
        .with_local_override(&format!(
            "packages:\n  dev:\n    type: local\n    path: {}\n",
            local.display()
        ));
    fixture
        .command()
        .args(["install", "--quiet"])
        .assert()
        .success();
    assert!(fixture.exists(".git-packages/dev"));

    fixture
        .command()
        .args(["remove", "dev", "-y"])
        .assert()
        .success();
    assert!(!fixture.exists(".git-packages/dev"));
    assert!(!fixture.read("git-pm.local.yaml").contains("dev:"));
}
