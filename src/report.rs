use crate::model::{Outcome, Phase, TestReport};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Tests seen in a libtest JSON stream, in first-seen order, plus the reports
/// of every test that finished.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub collected: Vec<String>,
    pub finished: Vec<TestReport>,
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    event: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    exec_time: Option<f64>,
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Reads a report from `path`, or from stdin when `path` is `-`.
pub fn load(path: &Path) -> Result<Session, String> {
    if path == Path::new("-") {
        return read(io::stdin().lock()).map_err(|e| format!("read report from stdin: {e}"));
    }

    let file = File::open(path).map_err(|e| format!("open report {}: {e}", path.display()))?;
    read(file).map_err(|e| format!("read report {}: {e}", path.display()))
}

/// Parses newline-delimited libtest JSON (`--format json`). Lines that are
/// not JSON objects, and events other than test start/finish, are skipped.
pub fn read(input: impl Read) -> io::Result<Session> {
    let mut session = Session::default();
    let mut seen = HashSet::new();

    for line in BufReader::new(input).lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            continue;
        }

        let Ok(event) = serde_json::from_str::<Event>(trimmed) else {
            continue;
        };

        if event.kind != "test" {
            continue;
        }

        let Some(name) = event.name else {
            continue;
        };

        if seen.insert(name.clone()) {
            session.collected.push(name.clone());
        }

        let (outcome, detail) = match event.event.as_str() {
            "ok" => (Outcome::Passed, None),
            "failed" => (Outcome::Failed, event.stdout.or(event.message)),
            "ignored" => (Outcome::Skipped, event.message),
            _ => continue,
        };

        session.finished.push(TestReport {
            test_id: name,
            phase: Phase::Call,
            outcome,
            detail: detail.filter(|d| !d.trim().is_empty()),
            duration: event.exec_time,
        });
    }

    Ok(session)
}
