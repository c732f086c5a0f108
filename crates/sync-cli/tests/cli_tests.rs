//! End-to-end tests that invoke the compiled `packsync` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use sync_test_utils::server::CACHE_FILE;
use sync_test_utils::{RuleBuilder, ServerDir, definitions};

fn packsync(dir: &ServerDir) -> Command {
    let mut cmd = Command::cargo_bin("packsync").unwrap();
    cmd.current_dir(dir.root())
        .env_remove("PACKSYNC_CONFIG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn modpack(dir: &ServerDir) {
    dir.write_file("packs/modpack1/cfg/a.txt", "alpha");
    dir.write_file("packs/modpack1/cfg/a.txt.bak", "backup");
    dir.write_file("packs/modpack1/manifest.json", r#"{"version":1}"#);
    dir.write_rules(&definitions(&[(
        "modpack1",
        RuleBuilder::new("packs/modpack1")
            .folder("config", "cfg")
            .ignore("*.bak")
            .file("manifest.json")
            .build(),
    )]));
}

fn stored_fingerprint(dir: &ServerDir) -> String {
    dir.read_json(CACHE_FILE)["packages"]["modpack1"]["md5"]
        .as_str()
        .unwrap()
        .to_string()
}

#[test]
fn help_lists_commands() {
    let dir = ServerDir::new();
    packsync(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check").and(predicate::str::contains("query")));
}

#[test]
fn config_without_file_shows_defaults() {
    let dir = ServerDir::new();
    packsync(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("20 calls / 60000 ms"));
}

#[test]
fn config_json_reflects_file() {
    let dir = ServerDir::new();
    dir.write_file("packsync.toml", "[call_limit]\ncount = 7\n");

    let output = packsync(&dir).args(["config", "--json"]).output().unwrap();
    assert!(output.status.success());

    let config: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["call_limit"]["count"], 7);
    assert_eq!(config["call_limit"]["window_ms"], 60000);
    assert_eq!(config["sync"]["source"], "local");
}

#[test]
fn check_builds_and_persists() {
    let dir = ServerDir::new();
    modpack(&dir);

    packsync(&dir)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("modpack1"))
        .stdout(predicate::str::contains("1 built, 0 failed, 0 unchanged"));

    dir.assert_exists(CACHE_FILE);
    assert_eq!(stored_fingerprint(&dir).len(), 64);
}

#[test]
fn check_json_reports_unchanged_on_second_pass() {
    let dir = ServerDir::new();
    modpack(&dir);
    packsync(&dir).arg("check").assert().success();

    let output = packsync(&dir).args(["check", "--json"]).output().unwrap();
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["built"], serde_json::json!([]));
    assert_eq!(report["unchanged"], 1);

    let output = packsync(&dir).args(["check", "--force", "--json"]).output().unwrap();
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["built"], serde_json::json!(["modpack1"]));
}

#[test]
fn check_without_rules_fails() {
    let dir = ServerDir::new();
    packsync(&dir)
        .arg("check")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error"))
        .stderr(predicate::str::contains("Rule definitions not found"));
}

#[test]
fn list_shows_ready_packages() {
    let dir = ServerDir::new();
    modpack(&dir);

    packsync(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("None"));

    packsync(&dir).arg("check").assert().success();
    packsync(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("modpack1"))
        .stdout(predicate::str::contains("ready"));
}

#[test]
fn inspection_commands_leave_no_files_behind() {
    let dir = ServerDir::new();
    modpack(&dir);

    packsync(&dir).arg("list").assert().success();
    packsync(&dir).args(["query", "modpack1"]).assert().failure();

    assert!(!dir.path(CACHE_FILE).exists());
}

#[test]
fn show_prints_client_payload() {
    let dir = ServerDir::new();
    modpack(&dir);
    packsync(&dir).arg("check").assert().success();

    let output = packsync(&dir).args(["show", "modpack1"]).output().unwrap();
    assert!(output.status.success());

    let view: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["data"], serde_json::json!(["config"]));
    assert_eq!(view["config"]["serverPath"], "cfg");
    assert!(view["config"]["files"].get("a.txt").is_some());
    assert!(view["config"]["files"].get("a.txt.bak").is_none());
    assert!(view["files"].get("manifest.json").is_some());
}

#[test]
fn query_honours_fingerprint() {
    let dir = ServerDir::new();
    modpack(&dir);
    packsync(&dir).arg("check").assert().success();
    let fingerprint = stored_fingerprint(&dir);

    packsync(&dir)
        .args(["query", "modpack1", "--fingerprint", &fingerprint.to_uppercase()])
        .assert()
        .success()
        .stdout(predicate::str::contains("not modified"));

    packsync(&dir)
        .args(["query", "modpack1", "--fingerprint", "stale"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"data\":[\"config\"]"));
}

#[test]
fn query_unknown_package_fails() {
    let dir = ServerDir::new();
    modpack(&dir);
    packsync(&dir).arg("check").assert().success();

    packsync(&dir)
        .args(["query", "modpack9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Package not found: modpack9"));
}

#[test]
fn explicit_config_anchors_relative_paths() {
    let dir = ServerDir::new();
    dir.write_file("srv/packs/p/mods/a.jar", "a");
    dir.write_file(
        "srv/packsync.toml",
        "[sync]\nrules_file = \"rules.json\"\ncache_file = \"cache.json\"\n",
    );
    dir.write_json(
        "srv/rules.json",
        &definitions(&[("p", RuleBuilder::new("packs/p").folder("mods", "mods").build())]),
    );

    packsync(&dir)
        .args(["--config", "srv/packsync.toml", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 built"));

    dir.assert_exists("srv/cache.json");
}
