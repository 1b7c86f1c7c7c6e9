//! CLI contract tests
//!
//! Runs the built binary against the JSON fixtures to verify output formats,
//! --output, --fail-below, deps, init, and error reporting for bad snapshots.
//! Each test runs inside its own temp directory so no stray config is picked
//! up.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn homediag_bin() -> &'static str {
    env!("CARGO_BIN_EXE_homediag")
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(homediag_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to run homediag")
}

fn analyze(dir: &Path, fixtures: &[&str], extra: &[&str]) -> Output {
    let paths: Vec<String> = fixtures
        .iter()
        .map(|f| fixture(f).to_string_lossy().into_owned())
        .collect();
    let mut args = vec!["analyze"];
    args.extend(paths.iter().map(String::as_str));
    args.extend(extra);
    run_in(dir, &args)
}

#[test]
fn test_json_output_is_valid() {
    let dir = TempDir::new().unwrap();
    let output = analyze(dir.path(), &["home.json"], &["--format", "json"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("stdout is JSON");
    assert_eq!(parsed["overall_score"], 71.0);
    assert_eq!(parsed["overall_label"], "GOOD");
    assert_eq!(parsed["total_issues"], 8);
    assert!(parsed["findings"].is_array());
    assert!(parsed["details"]["energy"]["total_kwh"].is_number());
}

#[test]
fn test_text_output_shows_trend_for_multiple_snapshots() {
    let dir = TempDir::new().unwrap();
    let output = analyze(dir.path(), &["mesh_21.json", "home.json"], &[]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Home Health Report"));
    assert!(stdout.contains("Score: 71.0/100"));
    assert!(stdout.contains("Trend: ▼ -29.0"));
}

#[test]
fn test_output_file_is_written() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("report.md");
    let output = analyze(
        dir.path(),
        &["conflicts.json"],
        &["--format", "markdown", "--output", report.to_str().unwrap()],
    );
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).trim().is_empty());

    let md = std::fs::read_to_string(&report).unwrap();
    assert!(md.starts_with("# Home Health Report"));
    assert!(md.contains("### Automations (2)"));
}

#[test]
fn test_fail_below_sets_exit_code() {
    let dir = TempDir::new().unwrap();
    let failing = analyze(dir.path(), &["home.json"], &["--fail-below", "80"]);
    assert_eq!(failing.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&failing.stderr).contains("--fail-below"));

    let passing = analyze(dir.path(), &["home.json"], &["--fail-below", "70"]);
    assert!(passing.status.success());
}

#[test]
fn test_unparseable_snapshot_fails() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{ this is not json").unwrap();

    let output = run_in(dir.path(), &["analyze", bad.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load snapshot"), "stderr: {}", stderr);
    assert!(output.stdout.is_empty());
}

#[test]
fn test_non_object_snapshot_fails() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("list.json");
    std::fs::write(&bad, "[]").unwrap();

    let output = run_in(dir.path(), &["analyze", bad.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn test_project_config_is_discovered() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("homediag.toml"),
        "[capabilities]\nbatteries = false\nupdates = false\n\n[defaults]\nformat = \"json\"\n",
    )
    .unwrap();

    let output = analyze(dir.path(), &["home.json"], &[]);
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("config default format is json");
    assert_eq!(parsed["overall_score"], 90.0);
}

#[test]
fn test_broken_explicit_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "[mesh]\nweak_link_fraction = 4.0\n").unwrap();

    let output = analyze(dir.path(), &["home.json"], &["--config", config.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn test_deps_lists_referrers() {
    let dir = TempDir::new().unwrap();
    let home = fixture("home.json");
    let output = run_in(
        dir.path(),
        &["deps", home.to_str().unwrap(), "sensor.door_battery", "light.kitchen", "--json"],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(parsed[0]["entity_id"], "sensor.door_battery");
    assert_eq!(parsed[0]["dashboards"][0], "lovelace");
    assert_eq!(parsed[1]["automations"][0], "automation.morning_lights");

    let text = run_in(dir.path(), &["deps", home.to_str().unwrap(), "switch.old_heater"]);
    assert!(String::from_utf8_lossy(&text.stdout).contains("unreferenced"));
}

#[test]
fn test_init_writes_config_once() {
    let dir = TempDir::new().unwrap();
    let first = run_in(dir.path(), &["init"]);
    assert!(first.status.success());
    let config = dir.path().join("homediag.toml");
    let written = std::fs::read_to_string(&config).unwrap();
    assert!(written.contains("[mesh]"));

    std::fs::write(&config, "# mine\n").unwrap();
    let second = run_in(dir.path(), &["init"]);
    assert!(second.status.success());
    assert_eq!(std::fs::read_to_string(&config).unwrap(), "# mine\n");
}
