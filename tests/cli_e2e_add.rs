//! End-to-end tests for the `add` command.

mod common;

use common::prelude::*;

/// Adding to a missing manifest creates it.
#[test]
fn test_add_creates_manifest() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["add", "scripts", "github.com/org/shared-scripts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added package 'scripts'"));

    let manifest = fixture.read("git-pm.yaml");
    assert!(manifest.contains("scripts:"));
    assert!(manifest.contains("repo: github.com/org/shared-scripts"));
    // Defaults: branch main.
    assert!(manifest.contains("type: branch"));
    assert!(manifest.contains("value: main"));
}

/// Explicit path and ref flags land in the manifest entry.
#[test]
fn test_add_with_path_and_tag() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args([
            "add",
            "net",
            "dev.azure.com/org/Platform%20Engineering/_git/tf-modules",
            "--path",
            "modules/net",
            "--ref-type",
            "tag",
            "--ref-value",
            "v1.4.0",
        ])
        .assert()
        .success();

    let manifest = fixture.read("git-pm.yaml");
    // The repo identifier is canonicalized.
    assert!(manifest.contains("dev.azure.com/org/Platform Engineering/tf-modules"));
    assert!(manifest.contains("path: modules/net"));
    assert!(manifest.contains("type: tag"));
    assert!(manifest.contains("value: v1.4.0"));
}

/// Adding an existing name replaces the entry in place.
#[test]
fn test_add_replaces_existing_entry() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["add", "lib", "github.com/org/lib", "--ref-type", "tag", "--ref-value", "v1"])
        .assert()
        .success();
    fixture
        .command()
        .args(["add", "lib", "github.com/org/lib", "--ref-type", "tag", "--ref-value", "v2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated package 'lib'"));

    let manifest = fixture.read("git-pm.yaml");
    assert!(manifest.contains("value: v2"));
    assert!(!manifest.contains("value: v1\n"));
    assert_eq!(manifest.matches("lib:").count(), 1);
}

/// Add does not install anything.
#[test]
fn test_add_does_not_install() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["add", "lib", "github.com/org/lib"])
        .assert()
        .success();
    assert!(!fixture.exists(".git-packages"));
    assert!(!fixture.exists(".git-pm.env"));
}

/// Round-trip law: add, remove, add with the same arguments converges to
/// the same manifest bytes.
#[test]
fn test_add_remove_add_roundtrip() {
    let fixture = TestFixture::new();
    let add = |fixture: &TestFixture| {
        fixture
            .command()
            .args(["add", "lib", "github.com/org/lib", "--ref-type", "tag", "--ref-value", "v1"])
            .assert()
            .success();
    };

    add(&fixture);
    let first = fixture.read("git-pm.yaml");

    fixture
        .command()
        .args(["remove", "lib", "-y"])
        .assert()
        .success();
    assert!(!fixture.read("git-pm.yaml").contains("lib:"));

    add(&fixture);
    assert_eq!(fixture.read("git-pm.yaml"), first);
}

/// Names that cannot be directory names are rejected.
#[test]
fn test_add_rejects_bad_name() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .args(["add", "bad/name", "github.com/org/lib"])
        .assert()
        .failure()
        .code(2);
}
