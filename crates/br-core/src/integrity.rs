//! Timestamp sanity checks over a parsed log.

use crate::finding::{Finding, LineRef};
use crate::logline::{DAY_MS, LogLine};

/// Lines kept after the integrity pass, plus what it found.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub lines: Vec<LogLine>,
    /// Lines dropped because a later time jump invalidated them.
    pub discarded: usize,
    pub findings: Vec<Finding>,
}

/// Builds the ordered sequence from ok lines and checks it.
///
/// A forward jump of more than a day discards everything accumulated so
/// far and restarts from the jumping line: a single rolled-over timestamp
/// would otherwise skew every relative time computed later. The dropped
/// count is reported as a [`Finding::TimeJump`].
///
/// Lines whose timestamp is lower than their predecessor's are reported as
/// a single [`Finding::OrderViolation`] listing every offending pair.
pub fn check_log(log: &str, lines: impl IntoIterator<Item = LogLine>) -> IntegrityReport {
    let mut report = IntegrityReport::default();
    let mut jumps = 0;

    for line in lines {
        if !line.ok {
            continue;
        }
        let jumped = report
            .lines
            .last()
            .is_some_and(|prev| line.timestamp - prev.timestamp > DAY_MS);
        if jumped {
            tracing::debug!(
                log,
                dropped = report.lines.len(),
                "time jump detected, restarting"
            );
            jumps += 1;
            report.discarded += report.lines.len();
            report.lines.clear();
        }
        report.lines.push(line);
    }

    if jumps > 0 {
        report.findings.push(Finding::TimeJump {
            log: log.to_string(),
            jumps,
            discarded: report.discarded,
        });
    }

    let pairs = order_violations(&report.lines);
    if !pairs.is_empty() {
        report.findings.push(Finding::OrderViolation {
            log: log.to_string(),
            pairs,
        });
    }

    report
}

/// Every adjacent pair `a, b` with `a.timestamp > b.timestamp`.
pub fn order_violations(lines: &[LogLine]) -> Vec<(LineRef, LineRef)> {
    lines
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0].timestamp > w[1].timestamp)
        .map(|(i, w)| (LineRef::new(i, &w[0]), LineRef::new(i + 1, &w[1])))
        .collect()
}
