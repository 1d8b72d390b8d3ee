//! Lists the sections of a dump.

use std::io::Write;

use anyhow::Result;
use br_core::IngestRun;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SectionSummary<'a> {
    id: u32,
    name: &'a str,
    short_name: &'a str,
    file_name: &'a str,
    lines: usize,
}

pub fn run<W: Write>(writer: &mut W, run: &IngestRun, json: bool) -> Result<()> {
    let summaries: Vec<SectionSummary<'_>> = run
        .sections()
        .iter()
        .map(|s| SectionSummary {
            id: s.id(),
            name: s.display_name(),
            short_name: s.short_name(),
            file_name: s.file_name(),
            lines: s.len(),
        })
        .collect();

    if json {
        serde_json::to_writer_pretty(&mut *writer, &summaries)?;
        writeln!(writer)?;
        return Ok(());
    }

    if summaries.is_empty() {
        writeln!(writer, "No sections found.")?;
        return Ok(());
    }

    writeln!(writer, "{:>4} {:>7}  NAME", "ID", "LINES")?;
    for s in &summaries {
        writeln!(writer, "{:>4} {:>7}  {}", s.id, s.lines, s.name)?;
    }
    Ok(())
}
