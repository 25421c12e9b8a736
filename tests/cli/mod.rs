use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

const CONFIG: &str = r#"version: 1

server:
  url: "http://127.0.0.1:1"
  user: "ci@example.com"
  api_key_env: "TESTRAIL_REPORTER_CLI_KEY"
  timeout: "2s"

run:
  project_id: 1
  suite_id: 2

cases:
  login::works: ["C1", "C2"]
  login::fails: ["C3"]
"#;

const REPORT: &str = r#"{ "type": "test", "event": "started", "name": "login::works" }
{ "type": "test", "name": "login::works", "event": "ok", "exec_time": 0.2 }
{ "type": "test", "name": "login::fails", "event": "failed", "stdout": "boom" }
"#;

#[test]
fn header_reports_new_run_by_default() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("testrail.yml"), CONFIG).expect("write config");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("testrail-reporter");
    cmd.current_dir(dir.path())
        .args(["header"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a new testrun will be created"));
}

#[test]
fn header_honours_plan_override() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("testrail.yml"), CONFIG).expect("write config");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("testrail-reporter");
    cmd.current_dir(dir.path())
        .args(["header", "--plan-id", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("existing testplan #9 selected"));
}

#[test]
fn publish_survives_unreachable_server() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("testrail.yml"), CONFIG).expect("write config");
    fs::write(dir.path().join("report.json"), REPORT).expect("write report");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("testrail-reporter");
    cmd.current_dir(dir.path())
        .env("TESTRAIL_REPORTER_CLI_KEY", "secret")
        .args(["--no-color", "publish", "--report", "report.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[testrail] Failed to create testrun"))
        .stdout(predicate::str::contains("[testrail] No data published"))
        .stdout(predicate::str::contains("processed 2 tests"));
}

#[test]
fn publish_requires_api_key() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("testrail.yml"), CONFIG).expect("write config");
    fs::write(dir.path().join("report.json"), REPORT).expect("write report");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("testrail-reporter");
    cmd.current_dir(dir.path())
        .env_remove("TESTRAIL_REPORTER_CLI_KEY")
        .args(["publish", "--report", "report.json"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("TESTRAIL_REPORTER_CLI_KEY"));
}

#[test]
fn cases_json_lists_mapping() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("testrail.yml"), CONFIG).expect("write config");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("testrail-reporter");
    let out = cmd
        .current_dir(dir.path())
        .args(["cases", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: Value = serde_json::from_slice(&out).expect("cases json");
    assert_eq!(parsed[0]["test"], "login::fails");
    assert_eq!(parsed[1]["case_ids"][1], "C2");
}

#[test]
fn init_writes_valid_template() {
    let dir = tempdir().expect("tempdir");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("testrail-reporter");
    cmd.current_dir(dir.path())
        .args(["init"])
        .assert()
        .success();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("testrail-reporter");
    cmd.current_dir(dir.path())
        .args(["validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("testrail-reporter");
    cmd.current_dir(dir.path())
        .args(["init"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn validate_json_reports_invalid_config_and_fails() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("testrail.yml"),
        r#"version: 1

server:
  url: "https://example.testrail.io"
  user: "ci"
  api_key_env: "KEY"

cases:
  bad: ["nope"]
"#,
    )
    .expect("write config");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("testrail-reporter");
    let out = cmd
        .current_dir(dir.path())
        .args(["validate", "--json"])
        .assert()
        .failure()
        .code(2)
        .get_output()
        .stdout
        .clone();

    let parsed: Value = serde_json::from_slice(&out).expect("validate json");
    assert_eq!(parsed["valid"], false);
    assert_eq!(parsed["config"], "./testrail.yml");
    assert_eq!(parsed["issues"][0]["field"], "run.project_id");
    assert_eq!(parsed["issues"][1]["field"], "cases.bad[0]");
    assert!(parsed["error"].as_str().is_some());
}
