use crate::model::TestItem;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;
use thiserror::Error;

static TRAILING_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaseIdError {
    #[error("case id {0:?} does not end with a number")]
    MissingDigits(String),
    #[error("case id {0:?} is out of range")]
    OutOfRange(String),
}

/// Extracts the trailing run of digits of a case identifier, e.g. `C123` -> 123.
pub fn parse_case_id(raw: &str) -> Result<u64, CaseIdError> {
    let digits = TRAILING_DIGITS_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| CaseIdError::MissingDigits(raw.to_string()))?;

    digits
        .as_str()
        .parse()
        .map_err(|_| CaseIdError::OutOfRange(raw.to_string()))
}

pub fn parse_case_ids<S: AsRef<str>>(raw: &[S]) -> Result<Vec<u64>, CaseIdError> {
    raw.iter().map(|id| parse_case_id(id.as_ref())).collect()
}

/// Test id to declared case ids, built once when collection completes.
#[derive(Debug, Clone, Default)]
pub struct CaseMap {
    by_test: HashMap<String, Vec<u64>>,
}

impl CaseMap {
    pub fn from_items(items: &[TestItem]) -> Result<Self, CaseIdError> {
        let mut by_test = HashMap::new();

        for item in items {
            if item.case_markers.is_empty() {
                continue;
            }
            let ids = parse_case_ids(&item.case_markers)?;
            by_test
                .entry(item.id.clone())
                .or_insert_with(Vec::new)
                .extend(ids);
        }

        Ok(Self { by_test })
    }

    pub fn case_ids(&self, test_id: &str) -> &[u64] {
        self.by_test.get(test_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sorted, de-duplicated union of every declared case id.
    pub fn all_case_ids(&self) -> Vec<u64> {
        self.by_test
            .values()
            .flatten()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

