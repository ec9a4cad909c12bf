use plugdeps_cli::test_utils::ClaudeHomeFixture;
use predicates::prelude::*;

use crate::common::plugdeps;

fn failing_home() -> plugdeps_cli::test_utils::ClaudeHome {
    ClaudeHomeFixture::new()
        .marketplace("acme")
        .installed("my-plugin", "acme", "1.0.0", true)
        .manifest(
            "my-plugin",
            "acme",
            r#"{
                "dependencies": {"other-plugin@cool-marketplace": "^1.0.0"},
                "optionalSystemDependencies": {"plugdeps-test-absent-tool": ">=2.0.0"}
            }"#,
        )
        .write()
}

/// `check | steps` lists required steps before optional ones and exits 1.
#[test]
fn test_steps_from_stdin() {
    let home = failing_home();
    let report = plugdeps(&home).arg("check").output().unwrap();
    assert_eq!(report.status.code(), Some(1));

    plugdeps(&home)
        .arg("steps")
        .write_stdin(report.stdout)
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("## Resolution Steps (2 issues)"))
        .stdout(predicate::str::contains(
            "1. [Required] other-plugin (required by my-plugin@acme)",
        ))
        .stdout(predicate::str::contains("   /plugin marketplace add cool-marketplace"))
        .stdout(predicate::str::contains("2. [Optional System] plugdeps-test-absent-tool"));
}

/// A report file works the same as stdin; `-` still means stdin.
#[test]
fn test_steps_from_file() {
    let home = failing_home();
    let report = plugdeps(&home).arg("check").output().unwrap();
    let path = home.root().join("report.json");
    std::fs::write(&path, &report.stdout).unwrap();

    plugdeps(&home)
        .arg("steps")
        .arg(&path)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[Required] other-plugin"));

    plugdeps(&home)
        .args(["steps", "-"])
        .write_stdin(report.stdout)
        .assert()
        .code(1);
}

/// Only optional steps: printed, but the exit code is 0.
#[test]
fn test_steps_optional_only_exits_zero() {
    let home = ClaudeHomeFixture::new()
        .marketplace("acme")
        .installed("my-plugin", "acme", "1.0.0", true)
        .manifest(
            "my-plugin",
            "acme",
            r#"{"optionalSystemDependencies": {"plugdeps-test-absent-tool": "*"}}"#,
        )
        .write();
    let report = plugdeps(&home).arg("check").output().unwrap();

    plugdeps(&home)
        .arg("steps")
        .write_stdin(report.stdout)
        .assert()
        .success()
        .stdout(predicate::str::contains("(1 issue)"))
        .stdout(predicate::str::contains("[Optional System]"));
}

#[test]
fn test_steps_all_satisfied() {
    let home = ClaudeHomeFixture::new().write();

    plugdeps(&home)
        .arg("steps")
        .write_stdin(r#"{"checkedScope": "enabled", "dependencies": []}"#)
        .assert()
        .success()
        .stdout("All dependencies satisfied.\n");
}

#[test]
fn test_steps_rejects_invalid_input() {
    let home = ClaudeHomeFixture::new().write();

    plugdeps(&home)
        .arg("steps")
        .write_stdin("definitely not a report")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid JSON input"));

    plugdeps(&home)
        .args(["steps", "no-such-report.json"])
        .assert()
        .code(2)
        .stderr(
            predicate::str::contains("File not found")
                .or(predicate::str::contains("no-such-report.json")),
        );
}
