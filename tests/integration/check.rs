use plugdeps_cli::test_utils::ClaudeHomeFixture;
use predicates::prelude::*;
use serde_json::json;

use crate::common::{only, plugdeps, run_json};

/// A satisfied dependency passes with exit code 0.
#[test]
fn test_check_satisfied() {
    let home = ClaudeHomeFixture::new()
        .marketplace("acme")
        .installed("my-plugin", "acme", "1.0.0", true)
        .installed("helper", "acme", "1.4.2", true)
        .manifest("my-plugin", "acme", r#"{"dependencies": {"helper@acme": "^1.2.0"}}"#)
        .write();

    let report = run_json(&home, &["check"], 0);

    assert_eq!(report["checkedScope"], "enabled");
    let result = only(&report, "dependencies");
    assert_eq!(result["plugin"], "helper");
    assert_eq!(result["marketplace"], "acme");
    assert_eq!(result["dependent"], "my-plugin@acme");
    assert_eq!(result["requiredVersion"], "^1.2.0");
    assert_eq!(result["installedVersion"], "1.4.2");
    assert_eq!(result["valid"], true);
    assert_eq!(result["enabled"], true);
    assert!(result.get("action").is_none());
}

/// An outdated dependency fails; the local catalog offers the fix.
#[test]
fn test_check_outdated_offers_update() {
    let home = ClaudeHomeFixture::new()
        .marketplace("acme")
        .installed("my-plugin", "acme", "1.0.0", true)
        .installed("helper", "acme", "1.0.0", true)
        .manifest("my-plugin", "acme", r#"{"dependencies": {"helper@acme": "^2.0.0"}}"#)
        .catalog("acme", &[("helper", Some("2.1.0"))])
        .write();

    let report = run_json(&home, &["check", "--with-actions"], 1);

    let result = only(&report, "dependencies");
    assert_eq!(result["valid"], false);
    assert_eq!(
        result["availability"],
        json!({"status": "available", "marketplace": "acme", "version": "2.1.0"})
    );
    assert_eq!(
        result["action"],
        json!({"type": "update", "name": "helper", "marketplace": "acme"})
    );
}

/// A dependency from a marketplace the host does not know.
#[test]
fn test_check_unknown_marketplace() {
    let home = ClaudeHomeFixture::new()
        .installed("my-plugin", "local", "0.1.0", true)
        .manifest(
            "my-plugin",
            "local",
            r#"{"dependencies": {"other-plugin@cool-marketplace": {"version": "^1.0.0", "help": "Adds review agents"}}}"#,
        )
        .write();

    let report = run_json(&home, &["check", "--with-actions"], 1);

    let result = only(&report, "dependencies");
    assert_eq!(result["installed"], false);
    assert_eq!(result["enabled"], serde_json::Value::Null);
    assert_eq!(result["marketplaceKnown"], false);
    assert_eq!(result["help"], "Adds review agents");
    assert_eq!(result["action"]["type"], "addMarketplace");
    assert_eq!(result["action"]["marketplace"], "cool-marketplace");
}

/// Missing optional dependencies are reported but never fail the run.
#[test]
fn test_check_optional_sections_do_not_fail() {
    let home = ClaudeHomeFixture::new()
        .marketplace("acme")
        .installed("my-plugin", "acme", "1.0.0", true)
        .manifest(
            "my-plugin",
            "acme",
            r#"{
                "optionalDependencies": {"linter@acme": ">=1.0.0"},
                "optionalSystemDependencies": {"plugdeps-test-absent-tool": "*"}
            }"#,
        )
        .write();

    let report = run_json(&home, &["check"], 0);

    assert_eq!(only(&report, "optionalDependencies")["valid"], false);
    let system = only(&report, "optionalSystemDependencies");
    assert_eq!(system["command"], "plugdeps-test-absent-tool");
    assert_eq!(system["installed"], false);
    assert_eq!(system["enabled"], serde_json::Value::Null);
}

/// A missing required system command fails the run.
#[test]
fn test_check_missing_system_command() {
    let home = ClaudeHomeFixture::new()
        .marketplace("acme")
        .installed("my-plugin", "acme", "1.0.0", true)
        .manifest(
            "my-plugin",
            "acme",
            r#"{"systemDependencies": {"plugdeps-test-absent-tool": {"version": ">=2.0.0", "help": "brew install it"}}}"#,
        )
        .write();

    let report = run_json(&home, &["check", "--with-actions"], 1);

    let result = only(&report, "systemDependencies");
    assert_eq!(result["installed"], false);
    assert_eq!(result["valid"], false);
    assert_eq!(result["action"]["type"], "installSystemDependency");
    assert_eq!(result["action"]["help"], "brew install it");
}

/// A manifest that cannot be parsed is skipped and recorded as an error.
#[test]
fn test_check_malformed_manifest() {
    let home = ClaudeHomeFixture::new()
        .marketplace("acme")
        .installed("my-plugin", "acme", "1.0.0", true)
        .manifest("my-plugin", "acme", "{ not json")
        .write();

    let report = run_json(&home, &["check"], 1);

    let errors = report["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["plugin"], "my-plugin@acme");
    assert!(report["dependencies"].as_array().unwrap().is_empty());
}

/// Disabled plugins are only checked with `--installed`.
#[test]
fn test_check_installed_scope_includes_disabled() {
    let home = ClaudeHomeFixture::new()
        .marketplace("acme")
        .installed("sleepy", "acme", "1.0.0", false)
        .manifest("sleepy", "acme", r#"{"dependencies": {"helper@acme": "^1.0.0"}}"#)
        .write();

    let report = run_json(&home, &["check"], 0);
    assert!(report["dependencies"].as_array().unwrap().is_empty());

    let report = run_json(&home, &["check", "--installed"], 1);
    assert_eq!(report["checkedScope"], "installed");
    assert_eq!(only(&report, "dependencies")["dependent"], "sleepy@acme");
}

/// `--all` also checks plugins a marketplace offers but nobody installed.
#[test]
fn test_check_all_scope_includes_offered_plugins() {
    let home = ClaudeHomeFixture::new()
        .marketplace("acme")
        .catalog("acme", &[("listed", Some("1.0.0"))])
        .manifest(
            "listed",
            "acme",
            r#"{"optionalSystemDependencies": {"plugdeps-test-absent-tool": "*"}}"#,
        )
        .write();

    let report = run_json(&home, &["check", "--all"], 0);

    assert_eq!(report["checkedScope"], "all");
    assert_eq!(only(&report, "optionalSystemDependencies")["dependent"], "listed@acme");
}

/// `--plugin` narrows the run and records the filter.
#[test]
fn test_check_plugin_filter() {
    let home = ClaudeHomeFixture::new()
        .marketplace("acme")
        .installed("first", "acme", "1.0.0", true)
        .installed("second", "acme", "1.0.0", true)
        .manifest("first", "acme", r#"{"dependencies": {"second@acme": "^1.0.0"}}"#)
        .manifest("second", "acme", r#"{"dependencies": {"third@acme": "^1.0.0"}}"#)
        .write();

    let report = run_json(&home, &["check", "--plugin", "first@acme"], 0);

    assert_eq!(report["checkedPlugin"], "first@acme");
    assert_eq!(only(&report, "dependencies")["plugin"], "second");
}

/// An unknown plugin filter is an error, with a suggestion when one is close.
#[test]
fn test_check_unknown_plugin_is_an_error() {
    let home = ClaudeHomeFixture::new()
        .marketplace("acme")
        .installed("bug-fixes", "acme", "1.0.0", true)
        .write();

    plugdeps(&home)
        .args(["check", "--plugin", "bug-fix"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("is not installed"))
        .stderr(predicate::str::contains("bug-fixes@acme"));
}

/// Identical state gives byte-identical reports.
#[test]
fn test_check_is_idempotent() {
    let home = ClaudeHomeFixture::new()
        .marketplace("acme")
        .installed("my-plugin", "acme", "1.0.0", true)
        .manifest(
            "my-plugin",
            "acme",
            r#"{"dependencies": {"zeta@acme": "^1.0.0", "alpha@acme": "^1.0.0"}}"#,
        )
        .write();

    let first = plugdeps(&home).args(["check", "--all"]).output().unwrap();
    let second = plugdeps(&home).args(["check", "--all"]).output().unwrap();

    assert_eq!(first.stdout, second.stdout);
    assert!(!first.stdout.is_empty());
}

/// `--pretty` spreads the report over multiple lines.
#[test]
fn test_check_pretty_output() {
    let home = ClaudeHomeFixture::new().write();

    plugdeps(&home)
        .args(["check", "--pretty"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\n  \"checkedScope\": \"enabled\""));
}

/// An invalid configuration file is reported before anything runs.
#[test]
fn test_check_invalid_config() {
    let home = ClaudeHomeFixture::new().write();
    let config = home.root().join("bad-config.toml");
    std::fs::write(&config, "probe_timeout_secs = 0\n").unwrap();

    plugdeps(&home)
        .env("PLUGDEPS_CONFIG", &config)
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("probe_timeout_secs"));
}
