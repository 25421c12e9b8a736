use serde::{Deserialize, Serialize};

/// Outcome reported by the test harness for one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

/// TestRail result status. The discriminants are the wire `status_id` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    Passed = 1,
    Skipped = 2,
    Failed = 5,
}

impl Status {
    pub fn id(self) -> u8 {
        self as u8
    }
}

impl From<Outcome> for Status {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Passed => Status::Passed,
            Outcome::Failed => Status::Failed,
            Outcome::Skipped => Status::Skipped,
        }
    }
}

/// Execution phase of a test report. Only `Call` produces results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Call,
    Teardown,
}

/// A collected test and the raw case identifiers declared on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestItem {
    pub id: String,
    pub case_markers: Vec<String>,
}

impl TestItem {
    pub fn new(id: impl Into<String>, case_markers: &[&str]) -> Self {
        Self {
            id: id.into(),
            case_markers: case_markers.iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestReport {
    pub test_id: String,
    pub phase: Phase,
    pub outcome: Outcome,
    pub detail: Option<String>,
    /// Elapsed seconds.
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub case_id: u64,
    pub status: Status,
    pub comment: Option<String>,
    pub duration: Option<f64>,
}
