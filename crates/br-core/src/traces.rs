//! Lock waits extracted from VM stack trace dumps.
//!
//! Each process block looks like:
//!
//! ```text
//! ----- pid 123 at 2012-11-17 12:34:56 -----
//! "main" prio=5 tid=1 MONITOR
//!   - waiting to lock <0x41a7b3e0> (a java.lang.Object) held by tid=12 (Thread-10)
//! "Thread-10" prio=5 tid=12 MONITOR
//!   - waiting to lock <0x41a7b3f0> (a java.lang.Object) held by thread 1
//! ----- end 123 -----
//! ```
//!
//! Dalvik writes `held by tid=N (NAME)`, ART writes `held by thread N`.

use std::sync::LazyLock;

use regex::Regex;

use crate::finding::Finding;
use crate::graph::ThreadGraph;
use crate::run::IngestRun;
use crate::section::{VM_TRACES_AT_LAST_ANR, VM_TRACES_JUST_NOW};

static PROCESS_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^----- pid (\d+) at .* -----$").unwrap());
static PROCESS_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^----- end (\d+) -----$").unwrap());
static THREAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"(.*)" (?:daemon )?prio=\d+ tid=(\d+)"#).unwrap());
static WAIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*- waiting to lock (<0x[0-9a-fA-F]+>(?: \(a [^)]+\))?) held by (?:tid=|thread )(\d+)")
        .unwrap()
});

#[derive(Debug, Default)]
struct ProcessBlock {
    pid: i32,
    /// (tid, name)
    threads: Vec<(u32, String)>,
    /// (waiting thread name, holder tid, lock label)
    waits: Vec<(String, u32, String)>,
}

impl ProcessBlock {
    fn new(pid: i32) -> Self {
        Self {
            pid,
            ..Self::default()
        }
    }

    fn thread_name(&self, tid: u32) -> Option<&str> {
        self.threads
            .iter()
            .find(|(t, _)| *t == tid)
            .map(|(_, name)| name.as_str())
    }

    /// Builds the wait-for graph once every thread of the block is known.
    fn graph(&self) -> ThreadGraph {
        let mut graph = ThreadGraph::new();
        for (_, name) in &self.threads {
            graph.add_thread(name);
        }
        for (waiter, holder_tid, lock) in &self.waits {
            let holder = self
                .thread_name(*holder_tid)
                .map_or_else(|| format!("tid={holder_tid}"), str::to_string);
            graph.add_dependency(waiter, &holder, lock);
        }
        graph
    }

    fn deadlock(&self) -> Option<Finding> {
        let graph = self.graph();
        let cycle = graph.find_cycle();
        if cycle.is_empty() {
            return None;
        }
        Some(Finding::Deadlock {
            pid: self.pid,
            threads: cycle.iter().map(|e| e.from_name.clone()).collect(),
            locks: cycle.iter().map(|e| e.lock.clone()).collect(),
        })
    }
}

/// One deadlock finding per process block whose threads wait in a cycle.
pub fn find_deadlocks(lines: &[String]) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut block: Option<ProcessBlock> = None;
    let mut current_thread: Option<String> = None;

    for line in lines {
        if let Some(caps) = PROCESS_START_RE.captures(line) {
            findings.extend(block.take().and_then(|b| b.deadlock()));
            block = caps[1].parse().ok().map(ProcessBlock::new);
            current_thread = None;
            continue;
        }
        if PROCESS_END_RE.is_match(line) {
            findings.extend(block.take().and_then(|b| b.deadlock()));
            current_thread = None;
            continue;
        }
        let Some(block) = block.as_mut() else {
            continue;
        };

        if let Some(caps) = THREAD_RE.captures(line) {
            let name = caps[1].to_string();
            if let Ok(tid) = caps[2].parse() {
                block.threads.push((tid, name.clone()));
            }
            current_thread = Some(name);
        } else if let Some(caps) = WAIT_RE.captures(line) {
            let (Some(waiter), Ok(holder)) = (current_thread.as_ref(), caps[2].parse()) else {
                continue;
            };
            block.waits.push((waiter.clone(), holder, caps[1].to_string()));
        }
    }
    findings.extend(block.and_then(|b| b.deadlock()));
    findings
}

/// Scans the trace sections of `run` and records any deadlock found.
pub fn scan_deadlocks(run: &mut IngestRun) -> usize {
    let mut findings = Vec::new();
    for name in [VM_TRACES_AT_LAST_ANR, VM_TRACES_JUST_NOW] {
        if let Some(section) = run.section(name) {
            findings.extend(find_deadlocks(section.lines()));
        }
    }
    let count = findings.len();
    for finding in findings {
        run.add_finding(finding);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    const DALVIK_DEADLOCK: &str = r#"----- pid 123 at 2012-11-17 12:34:56 -----
Cmd line: com.foo

"main" prio=5 tid=1 MONITOR
  | group="main" sCount=1 dsCount=0 obj=0x40a3c460 self=0x2a00b9e0
  at com.foo.A.run(A.java:10)
  - waiting to lock <0x41a7b3e0> (a java.lang.Object) held by tid=12 (Thread-10)

"Thread-10" prio=5 tid=12 MONITOR
  at com.foo.B.run(B.java:20)
  - waiting to lock <0x41a7b3f0> (a java.lang.Object) held by tid=1 (main)

----- end 123 -----
"#;

    #[test]
    fn dalvik_deadlock_is_found() {
        let findings = find_deadlocks(&lines(DALVIK_DEADLOCK));
        assert_eq!(
            findings,
            vec![Finding::Deadlock {
                pid: 123,
                threads: vec!["main".to_string(), "Thread-10".to_string()],
                locks: vec![
                    "<0x41a7b3e0> (a java.lang.Object)".to_string(),
                    "<0x41a7b3f0> (a java.lang.Object)".to_string(),
                ],
            }]
        );
    }

    #[test]
    fn art_held_by_thread_form() {
        let text = r#"----- pid 7 at 2016-01-01 00:00:00 -----
"main" prio=5 tid=1 Blocked
  - waiting to lock <0x0c3a5f1e> (a java.lang.Object) held by thread 2
"worker" daemon prio=5 tid=2 Blocked
  - waiting to lock <0x0d1e2f3a> (a java.lang.Object) held by thread 1
----- end 7 -----
"#;
        let findings = find_deadlocks(&lines(text));
        assert_eq!(findings.len(), 1);
        let Finding::Deadlock { pid, threads, .. } = &findings[0] else {
            panic!("expected deadlock");
        };
        assert_eq!(*pid, 7);
        assert_eq!(threads, &["main", "worker"]);
    }

    #[test]
    fn plain_contention_is_not_a_deadlock() {
        let text = r#"----- pid 5 at 2012-11-17 12:34:56 -----
"main" prio=5 tid=1 MONITOR
  - waiting to lock <0x1> (a java.lang.Object) held by tid=2 (worker)
"worker" prio=5 tid=2 RUNNABLE
  at com.foo.Worker.run(Worker.java:1)
----- end 5 -----
"#;
        assert!(find_deadlocks(&lines(text)).is_empty());
    }

    #[test]
    fn blocks_are_independent() {
        let text = r#"----- pid 1 at x -----
"a" prio=5 tid=1 MONITOR
  - waiting to lock <0x1> held by tid=2
----- end 1 -----
----- pid 2 at x -----
"b" prio=5 tid=2 MONITOR
  - waiting to lock <0x2> held by tid=1
----- end 2 -----
"#;
        assert!(find_deadlocks(&lines(text)).is_empty());
    }

    #[test]
    fn scan_adds_findings_to_run() {
        let mut run = IngestRun::new();
        let section = run.new_section(VM_TRACES_AT_LAST_ANR);
        for line in DALVIK_DEADLOCK.lines() {
            section.push_line(line);
        }
        assert_eq!(scan_deadlocks(&mut run), 1);
        assert_eq!(run.findings().len(), 1);
    }
}
