//! Turns log sections into ordered, checked log line streams.

use serde::Serialize;

use crate::integrity::check_log;
use crate::logline::{LogFormat, LogLine, parse_line};
use crate::run::IngestRun;
use crate::section::{EVENT_LOG, MAIN_LOG, RADIO_LOG, SYSTEM_LOG};
use crate::window::TimeWindow;

/// Sections parsed as logs unless configured otherwise.
pub const DEFAULT_LOG_SECTIONS: &[&str] = &[SYSTEM_LOG, EVENT_LOG, MAIN_LOG, RADIO_LOG];

/// A parsed log section.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedLog {
    /// Short name of the source section.
    pub name: String,
    /// Ok lines inside the time window, after integrity checks.
    pub lines: Vec<LogLine>,
    /// Raw text of lines no layout matched.
    pub failed: Vec<String>,
    /// Ok lines outside the time window.
    pub filtered: usize,
    /// Ok lines dropped by time jump handling.
    pub discarded: usize,
}

/// Parses the section named `section_name`, if present.
///
/// Processes seen in the log are recorded in the run, and integrity
/// findings are added to it.
pub fn parse_log(
    run: &mut IngestRun,
    section_name: &str,
    window: &mut TimeWindow,
) -> Option<ParsedLog> {
    let (section, processes) = run.section_with_processes(section_name)?;
    let name = section.short_name().to_string();

    let mut ok_lines = Vec::new();
    let mut failed = Vec::new();
    let mut filtered = 0;
    let mut hint: Option<LogFormat> = None;
    let mut previous: Option<LogLine> = None;

    for raw in section.lines() {
        if raw.trim().is_empty() || raw.starts_with("--------- beginning of ") {
            continue;
        }
        let line = parse_line(raw, hint, previous.as_ref());
        if !line.ok {
            tracing::trace!(log = %name, raw, "unparsed log line");
            failed.push(line.raw);
            continue;
        }
        hint = Some(line.format);
        previous = Some(line.copy());
        processes.attach(&line);

        if window.contains(line.timestamp) {
            ok_lines.push(line);
        } else {
            filtered += 1;
        }
    }

    let report = check_log(&name, ok_lines);
    for finding in report.findings {
        run.add_finding(finding);
    }

    tracing::debug!(
        log = %name,
        lines = report.lines.len(),
        failed = failed.len(),
        filtered,
        discarded = report.discarded,
        "parsed log"
    );

    Some(ParsedLog {
        name,
        lines: report.lines,
        failed,
        filtered,
        discarded: report.discarded,
    })
}

/// Parses every listed section that exists, in list order.
pub fn parse_logs<S: AsRef<str>>(
    run: &mut IngestRun,
    section_names: &[S],
    window: &TimeWindow,
) -> Vec<ParsedLog> {
    section_names
        .iter()
        .filter_map(|name| {
            // Each log infers an undated window on its own first line.
            let mut window = window.clone();
            parse_log(run, name.as_ref(), &mut window)
        })
        .collect()
}

/// Combines several logs into one timeline, stable by timestamp.
pub fn merge_logs(logs: &[&ParsedLog]) -> Vec<LogLine> {
    let mut merged: Vec<LogLine> = logs
        .iter()
        .flat_map(|log| log.lines.iter().map(LogLine::copy))
        .collect();
    merged.sort_by_key(|line| line.timestamp);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Finding;

    fn run_with(name: &str, lines: &[&str]) -> IngestRun {
        let mut run = IngestRun::new();
        let section = run.new_section(name);
        for line in lines {
            section.push_line(*line);
        }
        run
    }

    #[test]
    fn parses_and_counts() {
        let mut run = run_with(
            "SYSTEM LOG (logcat -v threadtime -d *:v)",
            &[
                "--------- beginning of /dev/log/main",
                "11-17 12:00:01.000   100   101 I Foo     : one",
                "not a log line",
                "",
                "11-17 12:00:02.000   100   102 W Bar     : two",
            ],
        );
        let log = parse_log(&mut run, SYSTEM_LOG, &mut TimeWindow::default()).unwrap();

        assert_eq!(log.name, SYSTEM_LOG);
        assert_eq!(log.lines.len(), 2);
        assert_eq!(log.failed, vec!["not a log line"]);
        assert_eq!(log.filtered, 0);
        assert_eq!(run.processes.get(100).unwrap().line_count, 2);
        assert!(run.findings().is_empty());
    }

    #[test]
    fn window_filters_lines() {
        let mut run = run_with(
            SYSTEM_LOG,
            &[
                "11-17 11:59:59.000 I/Foo(  1): early",
                "11-17 12:00:00.000 I/Foo(  1): start",
                "11-17 12:30:00.000 I/Foo(  1): middle",
                "11-17 13:00:01.000 I/Foo(  1): late",
            ],
        );
        let mut window = TimeWindow::parse("12:00..13:00").unwrap();
        let log = parse_log(&mut run, SYSTEM_LOG, &mut window).unwrap();

        let messages: Vec<&str> = log.lines.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, vec!["start", "middle"]);
        assert_eq!(log.filtered, 2);
    }

    #[test]
    fn lines_outside_window_still_reach_process_table() {
        let mut run = run_with(
            SYSTEM_LOG,
            &[
                "11-17 11:00:00.000 I/Early(  77): before",
                "11-17 12:30:00.000 I/Late(  88): inside",
            ],
        );
        let mut window = TimeWindow::parse("12:00..13:00").unwrap();
        let log = parse_log(&mut run, SYSTEM_LOG, &mut window).unwrap();

        assert_eq!(log.filtered, 1);
        assert_eq!(run.processes.get(77).unwrap().line_count, 1);
        assert_eq!(run.processes.get(88).unwrap().line_count, 1);
    }

    #[test]
    fn findings_are_recorded_on_the_run() {
        let mut run = run_with(
            EVENT_LOG,
            &[
                "11-17 12:00:02.000 I/Foo(  1): b",
                "11-17 12:00:01.000 I/Foo(  1): a",
            ],
        );
        parse_log(&mut run, EVENT_LOG, &mut TimeWindow::default()).unwrap();

        assert_eq!(run.findings().len(), 1);
        assert!(matches!(
            &run.findings()[0],
            Finding::OrderViolation { log, pairs } if log == EVENT_LOG && pairs.len() == 1
        ));
    }

    #[test]
    fn missing_section_is_skipped() {
        let mut run = run_with(SYSTEM_LOG, &["I/Foo(  1): x"]);
        let logs = parse_logs(&mut run, DEFAULT_LOG_SECTIONS, &TimeWindow::default());
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].lines[0].format, LogFormat::Short);
    }

    #[test]
    fn merged_timeline_interleaves() {
        let mut run = IngestRun::new();
        run.new_section(SYSTEM_LOG)
            .push_line("11-17 12:00:01.000 I/Sys(  1): s1");
        run.new_section(EVENT_LOG)
            .push_line("11-17 12:00:00.500 I/Evt(  1): e1");
        run.section_by_id_mut(1)
            .unwrap()
            .push_line("11-17 12:00:02.000 I/Sys(  1): s2");

        let logs = parse_logs(&mut run, &[SYSTEM_LOG, EVENT_LOG], &TimeWindow::default());
        let refs: Vec<&ParsedLog> = logs.iter().collect();
        let merged = merge_logs(&refs);

        let messages: Vec<&str> = merged.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, vec!["e1", "s1", "s2"]);
    }
}
