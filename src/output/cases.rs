use crate::output::{bold, info, muted, number};
use std::io::Write;

#[derive(Debug, Clone)]
pub struct CaseRow {
    pub test: String,
    pub case_ids: Vec<String>,
}

pub fn print_cases(mut w: impl Write, rows: &[CaseRow]) -> std::io::Result<()> {
    if rows.is_empty() {
        writeln!(w, "{} {}", info("i"), muted("No case mappings configured."))?;
        return Ok(());
    }

    for (idx, row) in rows.iter().enumerate() {
        writeln!(w, "{}", bold(&row.test))?;
        writeln!(w, "  cases: {}", number(&row.case_ids.join(", ")))?;

        if idx + 1 < rows.len() {
            writeln!(w)?;
        }
    }

    Ok(())
}
