mod cases;
mod style;

pub use cases::{CaseRow, print_cases};
pub use style::{bold, command, configure, failure, info, muted, number, success};

/// Counts of finished tests by outcome, for the publish summary line.
pub fn format_outcome_counts(passed: usize, failed: usize, skipped: usize) -> String {
    format!(
        "{} passed, {} failed, {} skipped",
        number(&passed.to_string()),
        number(&failed.to_string()),
        number(&skipped.to_string())
    )
}
