use crate::cases::parse_case_id;
use crate::client::ServerSettings;
use crate::model::TestItem;
use crate::publisher::PublisherSettings;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

pub const CURRENT_VERSION: i32 = 1;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static ENV_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub version: i32,
    pub server: Server,
    pub run: Run,
    /// Test name to the case identifiers it covers, e.g. `["C101", "C102"]`.
    pub cases: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Server {
    pub url: String,
    pub user: String,
    pub api_key_env: String,
    pub timeout: String,
    pub cert_check: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Run {
    pub project_id: Option<u64>,
    pub suite_id: Option<u64>,
    pub run_id: Option<u64>,
    pub plan_id: Option<u64>,
    pub assign_user_id: Option<u64>,
    pub milestone_id: Option<u64>,
    pub name: String,
    pub version: String,
    pub publish_skips: Option<bool>,
    pub close_on_finish: bool,
}

/// Command-line values that take precedence over the `run` section.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub run_id: Option<u64>,
    pub plan_id: Option<u64>,
    pub run_name: Option<String>,
    pub version: Option<String>,
    pub no_skips: bool,
    pub close: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    pub issues: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F: Into<String>, M: Into<String>>(&mut self, field: F, message: M) {
        self.issues.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(first) = self.issues.first() {
            write!(
                f,
                "configuration validation failed: {}: {}",
                first.field, first.message
            )
        } else {
            write!(f, "configuration validation failed")
        }
    }
}

impl std::error::Error for ValidationErrors {}

pub fn load(path: &Path) -> Result<Config, String> {
    let cfg = parse(path)?;
    validate(&cfg).map_err(|e| e.to_string())?;
    Ok(cfg)
}

pub fn parse(path: &Path) -> Result<Config, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("read config: {e}"))?;
    let cfg: Config = serde_yaml::from_str(&text).map_err(|e| format!("parse config yaml: {e}"))?;
    Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<(), ValidationErrors> {
    let mut issues = ValidationErrors::new();

    if cfg.version != CURRENT_VERSION {
        issues.add("version", format!("must be {CURRENT_VERSION}"));
    }

    validate_server(&mut issues, &cfg.server);
    validate_run(&mut issues, &cfg.run);
    validate_cases(&mut issues, &cfg.cases);

    if issues.has_issues() {
        Err(issues)
    } else {
        Ok(())
    }
}

impl Config {
    /// Connection settings, with the API key read from `server.api_key_env`.
    pub fn server_settings(&self) -> Result<ServerSettings, String> {
        let api_key = std::env::var(&self.server.api_key_env).map_err(|_| {
            format!(
                "environment variable {} is not set",
                self.server.api_key_env
            )
        })?;

        let timeout = resolve_duration(&self.server.timeout, DEFAULT_TIMEOUT)
            .map_err(|e| format!("server.timeout: {e}"))?;

        Ok(ServerSettings {
            url: self.server.url.clone(),
            user: self.server.user.clone(),
            api_key,
            timeout,
            cert_check: self.server.cert_check.unwrap_or(true),
        })
    }

    pub fn publisher_settings(&self, overrides: &Overrides) -> PublisherSettings {
        let run = &self.run;

        // An explicit id on the command line replaces both configured ids.
        let (run_id, plan_id) = if overrides.run_id.is_some() || overrides.plan_id.is_some() {
            (overrides.run_id, overrides.plan_id)
        } else {
            (run.run_id, run.plan_id)
        };

        PublisherSettings {
            project_id: run.project_id.unwrap_or_default(),
            suite_id: run.suite_id,
            run_id,
            plan_id,
            assign_user_id: run.assign_user_id,
            milestone_id: run.milestone_id,
            run_name: overrides
                .run_name
                .clone()
                .or_else(|| non_empty(&run.name)),
            version: overrides
                .version
                .clone()
                .or_else(|| non_empty(&run.version)),
            publish_skips: !overrides.no_skips && run.publish_skips.unwrap_or(true),
            close_on_finish: overrides.close || run.close_on_finish,
        }
    }

    /// One item per test name, carrying the case identifiers mapped to it.
    pub fn test_items<S: AsRef<str>>(&self, test_names: &[S]) -> Vec<TestItem> {
        test_names
            .iter()
            .map(|name| TestItem {
                id: name.as_ref().to_string(),
                case_markers: self.cases.get(name.as_ref()).cloned().unwrap_or_default(),
            })
            .collect()
    }
}

fn validate_server(issues: &mut ValidationErrors, s: &Server) {
    if s.url.trim().is_empty() {
        issues.add("server.url", "is required");
    } else if reqwest::Url::parse(&s.url).is_err() {
        issues.add("server.url", "must be a valid URL");
    }

    if s.user.trim().is_empty() {
        issues.add("server.user", "is required");
    }

    if s.api_key_env.is_empty() {
        issues.add("server.api_key_env", "is required");
    } else if !ENV_NAME_RE.is_match(&s.api_key_env) {
        issues.add(
            "server.api_key_env",
            "must be a valid environment variable name",
        );
    }

    if !s.timeout.is_empty() && parse_duration(&s.timeout).is_err() {
        issues.add("server.timeout", "must be a valid duration");
    }
}

fn validate_run(issues: &mut ValidationErrors, r: &Run) {
    match r.project_id {
        None => issues.add("run.project_id", "is required"),
        Some(0) => issues.add("run.project_id", "must be positive"),
        Some(_) => {}
    }

    let optional_ids = [
        ("run.suite_id", r.suite_id),
        ("run.run_id", r.run_id),
        ("run.plan_id", r.plan_id),
        ("run.assign_user_id", r.assign_user_id),
        ("run.milestone_id", r.milestone_id),
    ];

    for (field, id) in optional_ids {
        if id == Some(0) {
            issues.add(field, "must be positive");
        }
    }
}

fn validate_cases(issues: &mut ValidationErrors, cases: &BTreeMap<String, Vec<String>>) {
    for (name, ids) in cases {
        if name.trim().is_empty() {
            issues.add("cases", "test name must not be empty");
            continue;
        }

        let field = format!("cases.{name}");
        if ids.is_empty() {
            issues.add(field.clone(), "must list at least one case id");
        }

        for (idx, id) in ids.iter().enumerate() {
            if let Err(err) = parse_case_id(id) {
                issues.add(format!("{field}[{idx}]"), err.to_string());
            }
        }
    }
}

fn parse_duration(text: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(text)
}

fn resolve_duration(value: &str, default_value: Duration) -> Result<Duration, String> {
    if value.is_empty() {
        return Ok(default_value);
    }

    parse_duration(value).map_err(|_| "must be a valid duration".to_string())
}

fn non_empty(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
