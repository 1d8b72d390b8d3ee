//! Summary of a dump: metadata, log health and findings.

use std::io::Write;

use anyhow::Result;
use br_core::{DumpKind, Finding, GuessedValue, IngestRun, TimeWindow, parse_logs, scan_deadlocks};
use serde::Serialize;

use super::logs::LogStats;

#[derive(Debug, Serialize)]
struct Report<'a> {
    file_name: Option<&'a str>,
    kind: DumpKind,
    android_version: Option<&'a str>,
    build: Option<&'a str>,
    dump_time: Option<String>,
    sections: usize,
    processes: usize,
    logs: Vec<LogStats>,
    findings: &'a [Finding],
}

/// A guess nobody made yet is reported as missing.
fn known(value: &GuessedValue<String>) -> Option<&str> {
    (value.certainty() > 0 && !value.value().is_empty()).then(|| value.value().as_str())
}

pub fn run<W: Write, S: AsRef<str>>(
    writer: &mut W,
    run: &mut IngestRun,
    log_sections: &[S],
    window: &TimeWindow,
    json: bool,
) -> Result<()> {
    let logs = parse_logs(run, log_sections, window);
    let deadlocks = scan_deadlocks(run);
    tracing::debug!(logs = logs.len(), deadlocks, "analysis finished");

    let report = Report {
        file_name: known(&run.file_name),
        kind: *run.kind.value(),
        android_version: known(&run.android_version),
        build: known(&run.build),
        dump_time: run
            .dump_time
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string()),
        sections: run.sections().len(),
        processes: run.processes.len(),
        logs: logs.iter().map(LogStats::from).collect(),
        findings: run.findings(),
    };

    if json {
        serde_json::to_writer_pretty(&mut *writer, &report)?;
        writeln!(writer)?;
        return Ok(());
    }

    let or_unknown = |v: Option<&str>| v.unwrap_or("unknown").to_string();
    writeln!(writer, "Bugreport summary")?;
    writeln!(writer, "File: {}", or_unknown(report.file_name))?;
    writeln!(writer, "Kind: {}", report.kind)?;
    writeln!(writer, "Android version: {}", or_unknown(report.android_version))?;
    writeln!(writer, "Build: {}", or_unknown(report.build))?;
    writeln!(
        writer,
        "Dump time: {}",
        or_unknown(report.dump_time.as_deref())
    )?;
    writeln!(writer, "Sections: {}", report.sections)?;
    writeln!(writer, "Processes: {}", report.processes)?;

    if !report.logs.is_empty() {
        writeln!(writer, "Logs:")?;
        for log in &report.logs {
            writeln!(writer, "- {log}")?;
        }
    }

    if report.findings.is_empty() {
        writeln!(writer, "No findings.")?;
    } else {
        writeln!(writer, "Findings:")?;
        for finding in report.findings {
            writeln!(writer, "- {finding}")?;
        }
    }
    Ok(())
}
