//! Diagnostic findings collected during a run.

use std::fmt;

use serde::Serialize;

use crate::logline::{LogLine, format_timestamp};

/// A log line referenced by a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineRef {
    /// Position in the ordered log.
    pub index: usize,
    pub timestamp: i64,
    pub raw: String,
}

impl LineRef {
    pub fn new(index: usize, line: &LogLine) -> Self {
        Self {
            index,
            timestamp: line.timestamp,
            raw: line.raw.clone(),
        }
    }
}

/// Something worth reporting that is not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Finding {
    /// Adjacent lines whose timestamps go backwards.
    OrderViolation {
        log: String,
        pairs: Vec<(LineRef, LineRef)>,
    },
    /// The log jumped forward by more than a day; everything before the
    /// jump was dropped.
    TimeJump {
        log: String,
        jumps: usize,
        discarded: usize,
    },
    /// Threads waiting on each other in a cycle.
    Deadlock {
        pid: i32,
        threads: Vec<String>,
        locks: Vec<String>,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderViolation { log, pairs } => {
                write!(f, "{log}: {} timestamp order violation(s)", pairs.len())?;
                if let Some((a, b)) = pairs.first() {
                    write!(
                        f,
                        ", first at line {} ({} > {})",
                        b.index,
                        format_timestamp(a.timestamp),
                        format_timestamp(b.timestamp)
                    )?;
                }
                Ok(())
            }
            Self::TimeJump {
                log,
                jumps,
                discarded,
            } => write!(
                f,
                "{log}: {jumps} time jump(s) of more than a day, {discarded} earlier line(s) discarded"
            ),
            Self::Deadlock {
                pid,
                threads,
                locks,
            } => write!(
                f,
                "pid {pid}: deadlock between {} on {}",
                threads.join(" -> "),
                locks.join(", ")
            ),
        }
    }
}
