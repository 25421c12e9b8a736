use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;
use testrail_reporter::config::{
    self, Config, Overrides, Run, Server, load, validate,
};

fn valid_config() -> Config {
    let mut cases = BTreeMap::new();
    cases.insert(
        "login::accepts_valid_password".to_string(),
        vec!["C101".to_string(), "C102".to_string()],
    );

    Config {
        version: config::CURRENT_VERSION,
        server: Server {
            url: "https://example.testrail.io".to_string(),
            user: "ci@example.com".to_string(),
            api_key_env: "TESTRAIL_REPORTER_TEST_KEY".to_string(),
            timeout: "5s".to_string(),
            cert_check: None,
        },
        run: Run {
            project_id: Some(1),
            suite_id: Some(2),
            ..Run::default()
        },
        cases,
    }
}

#[test]
fn validate_accepts_complete_config() {
    validate(&valid_config()).expect("valid config");
}

#[test]
fn validate_reports_every_issue() {
    let mut cfg = valid_config();
    cfg.version = 2;
    cfg.server.url = "not a url".to_string();
    cfg.server.api_key_env = "1BAD".to_string();
    cfg.server.timeout = "soon".to_string();
    cfg.run.project_id = None;
    cfg.run.milestone_id = Some(0);
    cfg.cases
        .insert("broken".to_string(), vec!["CX".to_string()]);

    let err = validate(&cfg).expect_err("expected validation errors");
    let fields: Vec<&str> = err.issues.iter().map(|i| i.field.as_str()).collect();
    assert_eq!(
        fields,
        vec![
            "version",
            "server.url",
            "server.api_key_env",
            "server.timeout",
            "run.project_id",
            "run.milestone_id",
            "cases.broken[0]",
        ]
    );
    assert!(err.to_string().starts_with("configuration validation failed: version"));
}

#[test]
fn validate_rejects_empty_case_list() {
    let mut cfg = valid_config();
    cfg.cases.insert("empty".to_string(), Vec::new());

    let err = validate(&cfg).expect_err("expected validation error");
    assert!(err.to_string().contains("at least one case id"));
}

#[test]
fn load_rejects_unknown_field() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("testrail.yml");

    fs::write(
        &path,
        r#"version: 1
server:
  url: "https://example.testrail.io"
  user: "ci"
  api_key_env: "KEY"
  password: "oops"
run:
  project_id: 1
"#,
    )
    .expect("write config");

    assert!(load(&path).is_err());
}

#[test]
fn load_parses_yaml() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("testrail.yml");

    fs::write(
        &path,
        r#"version: 1
server:
  url: "https://example.testrail.io"
  user: "ci"
  api_key_env: "KEY"
run:
  project_id: 1
  plan_id: 7
  publish_skips: false
cases:
  login::works: ["C1", "C2"]
"#,
    )
    .expect("write config");

    let cfg = load(&path).expect("load config");
    assert_eq!(cfg.run.plan_id, Some(7));
    assert_eq!(cfg.cases["login::works"], vec!["C1", "C2"]);

    let settings = cfg.publisher_settings(&Overrides::default());
    assert!(!settings.publish_skips);
    assert_eq!(settings.plan_id, Some(7));
    assert_eq!(settings.run_id, None);
}

#[test]
fn publisher_settings_apply_overrides() {
    let mut cfg = valid_config();
    cfg.run.plan_id = Some(7);
    cfg.run.name = "Nightly".to_string();
    cfg.run.version = "1.0".to_string();

    let settings = cfg.publisher_settings(&Overrides::default());
    assert_eq!(settings.project_id, 1);
    assert_eq!(settings.plan_id, Some(7));
    assert_eq!(settings.run_name.as_deref(), Some("Nightly"));
    assert_eq!(settings.version.as_deref(), Some("1.0"));
    assert!(settings.publish_skips);
    assert!(!settings.close_on_finish);

    let overridden = cfg.publisher_settings(&Overrides {
        run_id: Some(100),
        version: Some("2.0".to_string()),
        no_skips: true,
        close: true,
        ..Overrides::default()
    });
    assert_eq!(overridden.run_id, Some(100));
    assert_eq!(overridden.plan_id, None);
    assert_eq!(overridden.version.as_deref(), Some("2.0"));
    assert!(!overridden.publish_skips);
    assert!(overridden.close_on_finish);
}

#[test]
fn server_settings_read_api_key_from_environment() {
    let mut cfg = valid_config();
    cfg.server.api_key_env = "TESTRAIL_REPORTER_TEST_MISSING_KEY".to_string();
    let err = cfg.server_settings().expect_err("expected missing key");
    assert!(err.contains("TESTRAIL_REPORTER_TEST_MISSING_KEY"));

    cfg.server.api_key_env = "PATH".to_string();
    let settings = cfg.server_settings().expect("server settings");
    assert_eq!(settings.timeout, Duration::from_secs(5));
    assert!(settings.cert_check);
    assert!(!settings.api_key.is_empty());
}

#[test]
fn test_items_attach_configured_cases() {
    let cfg = valid_config();
    let items = cfg.test_items(&["login::accepts_valid_password", "other"]);
    assert_eq!(items[0].case_markers, vec!["C101", "C102"]);
    assert!(items[1].case_markers.is_empty());
}
