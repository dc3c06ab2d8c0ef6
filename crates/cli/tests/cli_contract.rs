use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const MB: u64 = 1024 * 1024;

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("fixture should be written");
    path
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout should contain valid json")
}

#[test]
fn plan_emits_strategy_json() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let scenario = write_file(
        temp.path(),
        "scenario.json",
        r#"{ "active": [{ "id": 1, "stats": { "live_size": 10485760, "dead_size": 2097152 } }] }"#,
    );

    let output = cargo_bin_cmd!("cachehost")
        .arg("plan")
        .arg(&scenario)
        .arg("--limit")
        .arg("16MB")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    assert_eq!(value["limit"], 16 * MB);
    assert_eq!(value["tactics"]["active"], "keep_live_with_headroom");
    assert_eq!(value["tactics"]["inactive"], "divide_evenly");
    assert_eq!(value["allocations"][0]["renderer_id"], 1);
    assert_eq!(value["allocations"][0]["capacity"], 16 * MB);
}

#[test]
fn plan_uses_limit_from_preferences() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let scenario =
        write_file(temp.path(), "scenario.json", r#"{ "active": [{ "id": 1 }, { "id": 2 }] }"#);
    write_file(
        temp.path(),
        "preferences.json",
        r#"{ "version": 1, "preferences": { "memory_cache_size": 8388608 } }"#,
    );

    let output = cargo_bin_cmd!("cachehost")
        .arg("--prefs-dir")
        .arg(temp.path())
        .arg("plan")
        .arg(&scenario)
        .env_remove("CACHEHOST_MEMORY_CACHE_MB")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    assert_eq!(value["limit"], 8 * MB);
    assert_eq!(value["allocations"][0]["capacity"], 4 * MB);
    assert_eq!(value["allocations"][1]["capacity"], 4 * MB);
}

#[test]
fn replay_reports_each_enactment() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let script = write_file(
        temp.path(),
        "script.json",
        r#"{
            "limit": 8388608,
            "events": [
                { "event": "add", "renderer": 1 },
                { "event": "add", "renderer": 2 },
                { "event": "advance", "ms": 500 },
                { "event": "remove", "renderer": 2 },
                { "event": "advance", "ms": 500 }
            ]
        }"#,
    );

    let output = cargo_bin_cmd!("cachehost")
        .arg("--prefs-dir")
        .arg(temp.path())
        .arg("replay")
        .arg(&script)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    let enactments = value["enactments"].as_array().expect("enactments array");
    assert_eq!(enactments.len(), 2);
    assert_eq!(enactments[0]["at_ms"], 200);
    assert_eq!(enactments[0]["updates"].as_array().unwrap().len(), 2);
    assert_eq!(enactments[1]["at_ms"], 700);
    assert_eq!(enactments[1]["updates"][0]["capacity"], 8 * MB);
    assert_eq!(value["active"], serde_json::json!([1]));
}

#[test]
fn default_limit_reports_tiers() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    let output = cargo_bin_cmd!("cachehost")
        .arg("--prefs-dir")
        .arg(temp.path())
        .arg("default-limit")
        .env_remove("CACHEHOST_MEMORY_CACHE_MB")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    let default_limit = value["default_limit"].as_u64().unwrap();
    assert!([8 * MB, 16 * MB, 32 * MB].contains(&default_limit));
    assert_eq!(value["configured_limit"].as_u64(), Some(default_limit));
}

#[test]
fn plan_fails_for_missing_file() {
    cargo_bin_cmd!("cachehost")
        .arg("plan")
        .arg("does-not-exist.json")
        .arg("--limit")
        .arg("1MB")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read scenario"));
}

#[test]
fn plan_rejects_bad_limit() {
    cargo_bin_cmd!("cachehost")
        .arg("plan")
        .arg("scenario.json")
        .arg("--limit")
        .arg("lots")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid size"));
}

#[test]
fn replay_fails_for_invalid_json() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let script = write_file(temp.path(), "script.json", "{ not json");

    cargo_bin_cmd!("cachehost")
        .arg("--prefs-dir")
        .arg(temp.path())
        .arg("replay")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse replay script"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("cachehost")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
