use plugdeps_cli::test_utils::ClaudeHomeFixture;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::common::{plugdeps, run_json};

const COMMAND_DOC: &str = "# Deploy\n\nRun `gh pr create` when done.\nAsk @code-reviewer, then merge.\n";

fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn categories(matches: &Value) -> Vec<&str> {
    matches.as_array().unwrap().iter().map(|m| m["type"].as_str().unwrap()).collect()
}

#[test]
fn test_scan_plugin_dir() {
    let home = ClaudeHomeFixture::new().write();
    let plugin = home.root().join("work").join("deployer");
    write_file(&plugin.join("commands").join("deploy.md"), COMMAND_DOC);

    let plugin_arg = plugin.to_string_lossy().into_owned();
    let matches = run_json(&home, &["scan", "--plugin-dir", &plugin_arg], 0);

    let all = matches.as_array().unwrap();
    assert!(!all.is_empty());
    assert!(all.iter().all(|m| m["scannedPlugin"] == "deployer"));
    assert!(all.iter().all(|m| m["scannedMarketplace"] == "local"));

    let gh = all
        .iter()
        .find(|m| m["type"] == "systemCommand" && m["matched"] == "`gh pr create`")
        .expect("backticked gh command is reported");
    assert!(gh["location"].as_str().unwrap().ends_with("deploy.md:3:5"), "{gh}");

    assert!(categories(&matches).contains(&"agentReference"));
}

#[test]
fn test_scan_category_filter() {
    let home = ClaudeHomeFixture::new().write();
    let plugin = home.root().join("work").join("deployer");
    write_file(&plugin.join("commands").join("deploy.md"), COMMAND_DOC);

    let plugin_arg = plugin.to_string_lossy().into_owned();
    let matches =
        run_json(&home, &["scan", "--plugin-dir", &plugin_arg, "--category", "agentReference"], 0);

    let found = categories(&matches);
    assert!(!found.is_empty());
    assert!(found.iter().all(|c| *c == "agentReference"));
}

#[test]
fn test_scan_skips_vendored_and_unknown_files() {
    let home = ClaudeHomeFixture::new().write();
    let plugin = home.root().join("work").join("quiet");
    write_file(&plugin.join("node_modules").join("dep").join("README.md"), COMMAND_DOC);
    write_file(&plugin.join(".git").join("notes.md"), COMMAND_DOC);
    write_file(&plugin.join("assets").join("logo.svg"), COMMAND_DOC);

    let plugin_arg = plugin.to_string_lossy().into_owned();
    let matches = run_json(&home, &["scan", "--plugin-dir", &plugin_arg], 0);

    assert_eq!(matches, Value::Array(Vec::new()));
}

/// Without a target flag, enabled plugins are scanned from their install
/// directories.
#[test]
fn test_scan_enabled_plugins() {
    let home = ClaudeHomeFixture::new()
        .marketplace("acme")
        .installed("deployer", "acme", "1.0.0", true)
        .installed("dormant", "acme", "1.0.0", false)
        .write();
    write_file(&home.install_dir("deployer", "acme").join("README.md"), COMMAND_DOC);
    write_file(&home.install_dir("dormant", "acme").join("README.md"), COMMAND_DOC);

    let matches = run_json(&home, &["scan", "--category", "systemCommand"], 0);

    let all = matches.as_array().unwrap();
    assert!(!all.is_empty());
    assert!(all.iter().all(|m| m["scannedPlugin"] == "deployer"));
    assert!(all.iter().all(|m| m["scannedMarketplace"] == "acme"));
}

#[test]
fn test_scan_marketplace_dir() {
    let home = ClaudeHomeFixture::new().write();
    let marketplace = home.root().join("work").join("acme-market");
    for name in ["beta", "alpha"] {
        let plugin = marketplace.join("plugins").join(name);
        write_file(&plugin.join(".claude-plugin").join("plugin.json"), "{}");
        write_file(&plugin.join("SKILL.md"), "Use the /acme:lint command.\n");
    }
    write_file(&marketplace.join("plugins").join("not-a-plugin").join("x.md"), "/acme:lint ");

    let marketplace_arg = marketplace.to_string_lossy().into_owned();
    let matches = run_json(
        &home,
        &["scan", "--marketplace-dir", &marketplace_arg, "--category", "skillReference"],
        0,
    );

    let plugins: Vec<&str> = matches
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["scannedPlugin"].as_str().unwrap())
        .collect();
    assert!(plugins.contains(&"alpha"));
    assert!(plugins.contains(&"beta"));
    assert!(!plugins.contains(&"not-a-plugin"));
    assert!(matches.as_array().unwrap().iter().all(|m| m["scannedMarketplace"] == "acme-market"));
}

#[test]
fn test_scan_unknown_plugin_is_an_error() {
    let home = ClaudeHomeFixture::new().marketplace("acme").write();

    plugdeps(&home)
        .args(["scan", "--plugin", "ghost@acme"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("is not installed"));
}

#[test]
fn test_scan_targets_conflict() {
    let home = ClaudeHomeFixture::new().write();

    plugdeps(&home)
        .args(["scan", "--plugin-dir", ".", "--marketplace", "acme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
