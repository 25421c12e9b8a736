use crate::cases::{CaseIdError, CaseMap};
use crate::client::{
    ApiError, RemoteClient, add_result_path, add_run_path, close_run_path, get_milestone_path,
    get_plan_path, get_run_path,
};
use crate::model::{Phase, ResultRecord, Status, TestItem, TestReport};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use thiserror::Error;
use time::OffsetDateTime;

pub const LOG_TAG: &str = "testrail";
pub const COMMENT_SIZE_LIMIT: usize = 4000;
pub const COMMENT_BANNER: &str = "# Test result: #\n";
pub const TRUNCATION_NOTICE: &str = "Log truncated\n...\n";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    CaseId(#[from] CaseIdError),
    #[error("run target already resolved for this session")]
    AlreadyResolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublisherSettings {
    pub project_id: u64,
    pub suite_id: Option<u64>,
    pub run_id: Option<u64>,
    pub plan_id: Option<u64>,
    pub assign_user_id: Option<u64>,
    pub milestone_id: Option<u64>,
    pub run_name: Option<String>,
    pub version: Option<String>,
    pub publish_skips: bool,
    pub close_on_finish: bool,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            project_id: 0,
            suite_id: None,
            run_id: None,
            plan_id: None,
            assign_user_id: None,
            milestone_id: None,
            run_name: None,
            version: None,
            publish_skips: true,
            close_on_finish: false,
        }
    }
}

/// Remote destination of the session's results. Resolved once, at collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTarget {
    Unresolved,
    Plan(u64),
    Run(u64),
    Created(u64),
    None,
}

#[derive(Debug, Serialize)]
struct NewRun<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    suite_id: Option<u64>,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignedto_id: Option<u64>,
    include_all: bool,
    case_ids: &'a [u64],
    #[serde(skip_serializing_if = "Option::is_none")]
    milestone_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultPayload<'a> {
    pub status_id: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<String>,
}

impl<'a> ResultPayload<'a> {
    pub fn new(record: &ResultRecord, version: Option<&'a str>) -> Self {
        Self {
            status_id: record.status.id(),
            version: version.filter(|v| !v.is_empty()),
            comment: record
                .comment
                .as_deref()
                .filter(|c| !c.is_empty())
                .map(format_comment),
            elapsed: record.duration.and_then(format_elapsed),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Completion {
    is_completed: bool,
}

#[derive(Debug, Deserialize)]
struct CreatedRun {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct PlanRuns {
    #[serde(default)]
    entries: Vec<PlanEntry>,
}

#[derive(Debug, Deserialize)]
struct PlanEntry {
    #[serde(default)]
    runs: Vec<PlanRun>,
}

#[derive(Debug, Deserialize)]
struct PlanRun {
    id: u64,
    is_completed: bool,
}

/// Collects test outcomes during a session and publishes them to TestRail
/// when the session finishes.
///
/// Progress is written as `[testrail] ...` lines to `log`. Remote failures are
/// logged and never returned; only malformed case identifiers surface as
/// errors.
pub struct Publisher<C, W = io::Stdout> {
    client: C,
    settings: PublisherSettings,
    log: W,
    cases: CaseMap,
    target: RunTarget,
    results: Vec<ResultRecord>,
}

impl<C: RemoteClient> Publisher<C, io::Stdout> {
    pub fn new(client: C, settings: PublisherSettings) -> Self {
        Self::with_log(client, settings, io::stdout())
    }
}

impl<C: RemoteClient, W: Write> Publisher<C, W> {
    pub fn with_log(client: C, settings: PublisherSettings, log: W) -> Self {
        Self {
            client,
            settings,
            log,
            cases: CaseMap::default(),
            target: RunTarget::Unresolved,
            results: Vec::new(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn log(&self) -> &W {
        &self.log
    }

    pub fn settings(&self) -> &PublisherSettings {
        &self.settings
    }

    pub fn target(&self) -> RunTarget {
        self.target
    }

    pub fn results(&self) -> &[ResultRecord] {
        &self.results
    }

    pub fn header(&self) -> String {
        header_message(&self.settings)
    }

    pub fn on_collection_complete(&mut self, tests: &[TestItem]) -> Result<(), PublishError> {
        if self.target != RunTarget::Unresolved {
            return Err(PublishError::AlreadyResolved);
        }

        self.cases = CaseMap::from_items(tests)?;

        self.target = if let Some(plan_id) = self.settings.plan_id
            && self.is_testplan_available(plan_id)
        {
            RunTarget::Plan(plan_id)
        } else if let Some(run_id) = self.settings.run_id
            && self.is_testrun_available(run_id)
        {
            RunTarget::Run(run_id)
        } else {
            let name = self
                .settings
                .run_name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(default_run_name);
            let case_ids = self.cases.all_case_ids();
            match self.create_test_run(&name, &case_ids) {
                Some(run_id) => RunTarget::Created(run_id),
                None => RunTarget::None,
            }
        };

        Ok(())
    }

    pub fn on_test_finished(&mut self, report: &TestReport) {
        if report.phase != Phase::Call {
            return;
        }

        let status = Status::from(report.outcome);
        for &case_id in self.cases.case_ids(&report.test_id) {
            self.results.push(ResultRecord {
                case_id,
                status,
                comment: report.detail.clone(),
                duration: report.duration,
            });
        }
    }

    pub fn on_session_finished(&mut self) {
        self.note(format_args!("Start publishing"));

        if self.results.is_empty() {
            self.note(format_args!("No results to publish"));
        } else {
            let cases = join_ids(self.results.iter().map(|r| r.case_id));
            self.note(format_args!("Testcases to publish: {cases}"));

            match self.target {
                RunTarget::Run(run_id) | RunTarget::Created(run_id) => {
                    self.add_results(run_id);
                    if self.settings.close_on_finish {
                        self.close_test_run(run_id);
                    }
                }
                RunTarget::Plan(plan_id) => {
                    let runs = self.get_available_testruns(plan_id);
                    self.note(format_args!(
                        "Testruns to update: {}",
                        join_ids(runs.iter().copied())
                    ));
                    for run_id in runs {
                        self.add_results(run_id);
                    }
                }
                RunTarget::Unresolved | RunTarget::None => {
                    self.note(format_args!("No data published"));
                }
            }

            self.results.clear();
        }

        self.note(format_args!("End publishing"));
    }

    /// Submits every collected result to `run_id`, one call per record.
    pub fn add_results(&mut self, run_id: u64) {
        self.results
            .sort_by_key(|record| (record.case_id, record.status.id()));

        for record in &self.results {
            if record.status == Status::Skipped && !self.settings.publish_skips {
                continue;
            }

            let payload = ResultPayload::new(record, self.settings.version.as_deref());
            if let Err(err) = self
                .client
                .send_post(&add_result_path(run_id, record.case_id), &payload)
            {
                emit(
                    &mut self.log,
                    format_args!(
                        "Info: Testcase #{} not published for following reason: \"{err}\"",
                        record.case_id
                    ),
                );
            }
        }
    }

    pub fn create_test_run(&mut self, name: &str, case_ids: &[u64]) -> Option<u64> {
        let payload = NewRun {
            suite_id: self.settings.suite_id,
            name,
            assignedto_id: self.settings.assign_user_id,
            include_all: false,
            case_ids,
            milestone_id: self.settings.milestone_id,
        };

        let created = self
            .client
            .send_post(&add_run_path(self.settings.project_id), &payload)
            .and_then(decode::<CreatedRun>);

        match created {
            Ok(run) => {
                self.note(format_args!(
                    "New testrun created with name \"{name}\" and ID={}",
                    run.id
                ));
                Some(run.id)
            }
            Err(err) => {
                self.note(format_args!("Failed to create testrun: \"{err}\""));
                None
            }
        }
    }

    pub fn close_test_run(&mut self, run_id: u64) -> bool {
        let closed = self
            .client
            .send_post(&close_run_path(run_id), &serde_json::json!({}));

        match closed {
            Ok(_) => {
                self.note(format_args!("Testrun closed with ID={run_id}"));
                true
            }
            Err(err) => {
                self.note(format_args!("Failed to close testrun #{run_id}: \"{err}\""));
                false
            }
        }
    }

    /// True when the run exists and is still open.
    pub fn is_testrun_available(&mut self, run_id: u64) -> bool {
        match self.fetch::<Completion>(&get_run_path(run_id)) {
            Ok(run) => !run.is_completed,
            Err(err) => {
                self.note(format_args!("Failed to retrieve testrun #{run_id}: \"{err}\""));
                false
            }
        }
    }

    /// True when the plan exists and is still open.
    pub fn is_testplan_available(&mut self, plan_id: u64) -> bool {
        match self.fetch::<Completion>(&get_plan_path(plan_id)) {
            Ok(plan) => !plan.is_completed,
            Err(err) => {
                self.note(format_args!(
                    "Failed to retrieve testplan #{plan_id}: \"{err}\""
                ));
                false
            }
        }
    }

    /// True when the configured milestone exists and is still open. Not
    /// consulted when creating runs.
    pub fn is_milestone_available(&mut self) -> bool {
        let Some(milestone_id) = self.settings.milestone_id else {
            return false;
        };

        match self.fetch::<Completion>(&get_milestone_path(milestone_id)) {
            Ok(milestone) => !milestone.is_completed,
            Err(err) => {
                self.note(format_args!(
                    "Failed to retrieve milestone #{milestone_id}: \"{err}\""
                ));
                false
            }
        }
    }

    /// Open runs across every entry of the plan.
    pub fn get_available_testruns(&mut self, plan_id: u64) -> Vec<u64> {
        match self.fetch::<PlanRuns>(&get_plan_path(plan_id)) {
            Ok(plan) => plan
                .entries
                .into_iter()
                .flat_map(|entry| entry.runs)
                .filter(|run| !run.is_completed)
                .map(|run| run.id)
                .collect(),
            Err(err) => {
                self.note(format_args!(
                    "Failed to retrieve testplan #{plan_id}: \"{err}\""
                ));
                Vec::new()
            }
        }
    }

    fn fetch<T: DeserializeOwned>(&mut self, path: &str) -> Result<T, ApiError> {
        self.client.send_get(path).and_then(decode)
    }

    fn note(&mut self, args: fmt::Arguments<'_>) {
        emit(&mut self.log, args);
    }
}

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

// A broken log sink must not abort publishing.
fn emit(w: &mut impl Write, args: fmt::Arguments<'_>) {
    let _ = writeln!(w, "[{LOG_TAG}] {args}");
}

fn join_ids(ids: impl Iterator<Item = u64>) -> String {
    ids.map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

pub fn header_message(settings: &PublisherSettings) -> String {
    if let Some(plan_id) = settings.plan_id {
        format!("{LOG_TAG}: existing testplan #{plan_id} selected")
    } else if let Some(run_id) = settings.run_id {
        format!("{LOG_TAG}: existing testrun #{run_id} selected")
    } else {
        format!("{LOG_TAG}: a new testrun will be created")
    }
}

/// `Automated Run <dd-mm-YYYY HH:MM:SS>` in UTC.
pub fn default_run_name() -> String {
    run_name_at(OffsetDateTime::now_utc())
}

pub fn run_name_at(at: OffsetDateTime) -> String {
    let stamp = at
        .format(&time::macros::format_description!(
            "[day]-[month]-[year] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    format!("Automated Run {stamp}")
}

/// Banner, optional truncation notice, then the last
/// [`COMMENT_SIZE_LIMIT`] characters indented by four spaces per line so
/// TestRail renders them verbatim.
pub fn format_comment(comment: &str) -> String {
    let total = comment.chars().count();
    let mut out = String::from(COMMENT_BANNER);

    let body = if total > COMMENT_SIZE_LIMIT {
        out.push_str(TRUNCATION_NOTICE);
        let start = comment
            .char_indices()
            .nth(total - COMMENT_SIZE_LIMIT)
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        &comment[start..]
    } else {
        comment
    };

    out.push_str("    ");
    out.push_str(&body.replace('\n', "\n    "));
    out
}

/// Whole seconds, at least one. TestRail has no sub-second resolution.
pub fn format_elapsed(duration: f64) -> Option<String> {
    if !duration.is_finite() || duration <= 0.0 {
        return None;
    }

    let secs = if duration < 1.0 {
        1
    } else {
        duration.round_ties_even() as u64
    };
    Some(format!("{secs}s"))
}
