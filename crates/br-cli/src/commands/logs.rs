//! Parses the log sections of a dump.

use std::io::Write;

use anyhow::Result;
use br_core::{Finding, IngestRun, ParsedLog, TimeWindow, merge_logs, parse_logs};
use serde::Serialize;

/// Line counts of one parsed log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogStats {
    pub name: String,
    pub lines: usize,
    pub failed: usize,
    pub filtered: usize,
    pub discarded: usize,
}

impl From<&ParsedLog> for LogStats {
    fn from(log: &ParsedLog) -> Self {
        Self {
            name: log.name.clone(),
            lines: log.lines.len(),
            failed: log.failed.len(),
            filtered: log.filtered,
            discarded: log.discarded,
        }
    }
}

impl std::fmt::Display for LogStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} lines ({} failed, {} filtered, {} discarded)",
            self.name, self.lines, self.failed, self.filtered, self.discarded
        )
    }
}

#[derive(Debug, Serialize)]
struct LogsOutput<'a> {
    logs: Vec<LogStats>,
    findings: &'a [Finding],
}

pub fn run<W: Write, S: AsRef<str>>(
    writer: &mut W,
    run: &mut IngestRun,
    log_sections: &[S],
    window: &TimeWindow,
    merged: bool,
    json: bool,
) -> Result<()> {
    let logs = parse_logs(run, log_sections, window);

    if merged {
        let refs: Vec<&ParsedLog> = logs.iter().collect();
        let timeline = merge_logs(&refs);
        if json {
            serde_json::to_writer_pretty(&mut *writer, &timeline)?;
            writeln!(writer)?;
        } else {
            for line in &timeline {
                writeln!(writer, "{}", line.raw)?;
            }
        }
        return Ok(());
    }

    let stats: Vec<LogStats> = logs.iter().map(LogStats::from).collect();
    if json {
        let output = LogsOutput {
            logs: stats,
            findings: run.findings(),
        };
        serde_json::to_writer_pretty(&mut *writer, &output)?;
        writeln!(writer)?;
        return Ok(());
    }

    if stats.is_empty() {
        writeln!(writer, "No log sections found.")?;
        return Ok(());
    }
    for s in &stats {
        writeln!(writer, "{s}")?;
    }
    if !run.findings().is_empty() {
        writeln!(writer, "Findings:")?;
        for finding in run.findings() {
            writeln!(writer, "- {finding}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use br_core::DEFAULT_LOG_SECTIONS;
    use insta::assert_snapshot;

    fn sample_run() -> IngestRun {
        let mut run = IngestRun::new();
        let system = run.new_section("SYSTEM LOG (logcat -v threadtime -d *:v)");
        system.push_line("11-17 12:00:01.000   100   101 I Foo     : one");
        system.push_line("garbage");
        system.push_line("11-17 12:00:03.000   100   101 I Foo     : three");
        let events = run.new_section("EVENT LOG (logcat -b events -v threadtime -d *:v)");
        events.push_line("11-17 12:00:02.000   100   101 I am_foo  : [1]");
        run
    }

    #[test]
    fn stats_per_log() {
        let mut run = sample_run();
        let mut output = Vec::new();
        super::run(
            &mut output,
            &mut run,
            DEFAULT_LOG_SECTIONS,
            &TimeWindow::default(),
            false,
            false,
        )
        .unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        SYSTEM LOG: 2 lines (1 failed, 0 filtered, 0 discarded)
        EVENT LOG: 1 lines (0 failed, 0 filtered, 0 discarded)
        ");
    }

    #[test]
    fn merged_is_one_timeline() {
        let mut run = sample_run();
        let mut output = Vec::new();
        super::run(
            &mut output,
            &mut run,
            DEFAULT_LOG_SECTIONS,
            &TimeWindow::default(),
            true,
            false,
        )
        .unwrap();

        let output = String::from_utf8(output).unwrap();
        let messages: Vec<&str> = output
            .lines()
            .map(|l| l.rsplit(": ").next().unwrap())
            .collect();
        assert_eq!(messages, vec!["one", "[1]", "three"]);
    }

    #[test]
    fn window_counts_filtered_lines() {
        let mut run = sample_run();
        let window = TimeWindow::parse("12:00:02..").unwrap();
        let mut output = Vec::new();
        super::run(&mut output, &mut run, &["SYSTEM LOG"], &window, false, true).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["logs"][0]["lines"], 1);
        assert_eq!(value["logs"][0]["filtered"], 1);
        assert_eq!(value["findings"], serde_json::json!([]));
    }
}
