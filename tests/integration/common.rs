//! Shared helpers for the integration suite.

use assert_cmd::Command;
use plugdeps_cli::test_utils::ClaudeHome;
use serde_json::Value;

/// A `plugdeps` invocation bound to `home`, with no config file, no remote
/// catalogs and no inherited log filter.
pub fn plugdeps(home: &ClaudeHome) -> Command {
    let mut cmd = Command::cargo_bin("plugdeps").unwrap();
    cmd.env("PLUGDEPS_CONFIG", home.root().join("absent-config.toml"))
        .env_remove("RUST_LOG")
        .env_remove("CLAUDE_CONFIG_DIR")
        .arg("--claude-dir")
        .arg(home.root())
        .arg("--no-remote");
    cmd
}

/// Run `plugdeps` and parse stdout as JSON, asserting the exit code.
pub fn run_json(home: &ClaudeHome, args: &[&str], code: i32) -> Value {
    let output = plugdeps(home).args(args).assert().code(code);
    let stdout = String::from_utf8_lossy(&output.get_output().stdout).into_owned();
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {stdout}"))
}

/// The single result in `section`, asserting there is exactly one.
pub fn only<'a>(report: &'a Value, section: &str) -> &'a Value {
    let results = report[section].as_array().unwrap();
    assert_eq!(results.len(), 1, "expected one result in {section}: {report:#}");
    &results[0]
}
