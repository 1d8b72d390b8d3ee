//! Per-process records built from log lines.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::guess::GuessedValue;
use crate::logline::LogLine;

/// `Start proc 1234:com.foo/u0a12 for ...` (newer) and
/// `Start proc com.foo for activity ...: pid=1234 uid=...` (older).
static START_PROC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Start proc (?:(\d+):([^/\s]+)/|(\S+) for .*: pid=(\d+))").unwrap()
});

const NAME_FROM_EVENT_LOG: u32 = 50;
const NAME_FROM_START_PROC: u32 = 30;

/// What the logs tell us about one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    pub pid: i32,
    pub name: GuessedValue<String>,
    pub line_count: usize,
    pub first_ts: i64,
    pub last_ts: i64,
}

impl ProcessRecord {
    fn new(pid: i32, ts: i64) -> Self {
        Self {
            pid,
            name: GuessedValue::default(),
            line_count: 0,
            first_ts: ts,
            last_ts: ts,
        }
    }
}

/// Processes keyed by pid.
#[derive(Debug, Default)]
pub struct ProcessTable {
    processes: BTreeMap<i32, ProcessRecord>,
}

impl ProcessTable {
    /// Records `line` against its pid, and any process name it announces.
    pub fn attach(&mut self, line: &LogLine) {
        if line.ok && line.pid != 0 {
            let record = self
                .processes
                .entry(line.pid)
                .or_insert_with(|| ProcessRecord::new(line.pid, line.timestamp));
            record.line_count += 1;
            record.first_ts = record.first_ts.min(line.timestamp);
            record.last_ts = record.last_ts.max(line.timestamp);
        }

        if let Some((pid, name, certainty)) = announced_process(line) {
            self.processes
                .entry(pid)
                .or_insert_with(|| ProcessRecord::new(pid, line.timestamp))
                .name
                .set(name, certainty);
        }
    }

    pub fn get(&self, pid: i32) -> Option<&ProcessRecord> {
        self.processes.get(&pid)
    }

    /// Records in pid order.
    pub fn iter(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.processes.values()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

/// Extracts `(pid, name, certainty)` from process start announcements.
fn announced_process(line: &LogLine) -> Option<(i32, String, u32)> {
    if !line.ok {
        return None;
    }
    match line.tag.as_str() {
        // [user,pid,uid,name,type,component] or, before multi-user,
        // [pid,uid,name,type,component]
        "am_proc_start" => {
            let (pid, name) = match line.fields.len() {
                6.. => (&line.fields[1], &line.fields[3]),
                5 => (&line.fields[0], &line.fields[2]),
                _ => return None,
            };
            Some((pid.parse().ok()?, name.clone(), NAME_FROM_EVENT_LOG))
        }
        "ActivityManager" => {
            let caps = START_PROC_RE.captures(&line.message)?;
            let (pid, name) = match (caps.get(1), caps.get(2)) {
                (Some(pid), Some(name)) => (pid, name),
                _ => (caps.get(4)?, caps.get(3)?),
            };
            Some((
                pid.as_str().parse().ok()?,
                name.as_str().to_string(),
                NAME_FROM_START_PROC,
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logline::parse_line;

    #[test]
    fn counts_lines_per_pid() {
        let mut table = ProcessTable::default();
        for raw in [
            "01-01 00:00:01.000 I/Foo(  100): a",
            "01-01 00:00:02.000 I/Foo(  100): b",
            "01-01 00:00:03.000 I/Bar(  200): c",
        ] {
            table.attach(&parse_line(raw, None, None));
        }

        assert_eq!(table.len(), 2);
        let record = table.get(100).unwrap();
        assert_eq!(record.line_count, 2);
        assert!(record.first_ts < record.last_ts);
    }

    #[test]
    fn failed_and_pidless_lines_are_ignored() {
        let mut table = ProcessTable::default();
        table.attach(&parse_line("garbage", None, None));
        table.attach(&parse_line("I/Foo(    0): kernel", None, None));
        assert!(table.is_empty());
    }

    #[test]
    fn event_log_names_beat_activity_manager() {
        let mut table = ProcessTable::default();
        table.attach(&parse_line(
            "01-01 00:00:01.000 I/ActivityManager(  300): Start proc 1234:com.foo/u0a12 for activity com.foo/.Main",
            None,
            None,
        ));
        assert_eq!(table.get(1234).unwrap().name.value(), "com.foo");

        table.attach(&parse_line(
            "01-01 00:00:01.000 I/am_proc_start(  300): [0,1234,10012,com.foo:remote,activity,com.foo/.Main]",
            None,
            None,
        ));
        let name = &table.get(1234).unwrap().name;
        assert_eq!(name.value(), "com.foo:remote");
        assert_eq!(name.certainty(), NAME_FROM_EVENT_LOG);
    }

    #[test]
    fn legacy_start_proc_message() {
        let mut table = ProcessTable::default();
        table.attach(&parse_line(
            "01-01 00:00:01.000 I/ActivityManager(  300): Start proc com.bar for broadcast com.bar/.Rx: pid=777 uid=10001 gids={}",
            None,
            None,
        ));
        assert_eq!(table.get(777).unwrap().name.value(), "com.bar");
        // The announcing system process is tracked too.
        assert_eq!(table.get(300).unwrap().line_count, 1);
        // The announced process has no lines of its own yet.
        assert_eq!(table.get(777).unwrap().line_count, 0);
    }
}
