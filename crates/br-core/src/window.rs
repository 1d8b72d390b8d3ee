//! Time window filters for clipping logs.
//!
//! A marker is written `[MM-DD/]HH[:MM[:SS[.mmm]]]`; a window joins two
//! markers with `..`, either side may be empty:
//!
//! ```text
//! 11-17/12:00:12.012..11-17/13:00:00
//! 12:00..
//! ..08
//! ```

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::logline::{DAY_MS, HOUR_MS, MINUTE_MS, SECOND_MS};

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d{1,2})-(\d{1,2})/)?(\d{1,2})(?::(\d{1,2})(?::(\d{1,2})(?:\.(\d{1,3}))?)?)?$")
        .unwrap()
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeWindowError {
    #[error("invalid time marker '{0}', expected [MM-DD/]HH[:MM[:SS[.mmm]]]")]
    Marker(String),
    #[error("time marker '{0}' is out of range")]
    OutOfRange(String),
    #[error("invalid time window '{0}', expected START..END")]
    MissingSeparator(String),
}

/// One side of a time window.
///
/// When no date was given, the date is taken from the first timestamp the
/// marker is compared against, meaning "whatever day the log starts on".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeWindowMarker {
    date: Option<i64>,
    time: Option<i64>,
    resolved: Option<i64>,
}

impl TimeWindowMarker {
    /// Parses a marker. An empty string yields a marker that filters nothing.
    pub fn parse(text: &str) -> Result<Self, TimeWindowError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::default());
        }

        let caps = MARKER_RE
            .captures(text)
            .ok_or_else(|| TimeWindowError::Marker(text.to_string()))?;
        let number = |i: usize| {
            caps.get(i)
                .map_or(Ok(0), |m| m.as_str().parse::<i64>())
                .map_err(|_| TimeWindowError::Marker(text.to_string()))
        };

        let (hour, minute, second, millis) = (number(3)?, number(4)?, number(5)?, number(6)?);
        if hour > 23 || minute > 59 || second > 59 {
            return Err(TimeWindowError::OutOfRange(text.to_string()));
        }
        let time = hour * HOUR_MS + minute * MINUTE_MS + second * SECOND_MS + millis;

        let date = if caps.get(1).is_some() {
            let (month, day) = (number(1)?, number(2)?);
            if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
                return Err(TimeWindowError::OutOfRange(text.to_string()));
            }
            Some(month * 31 + day)
        } else {
            None
        };

        Ok(Self {
            date,
            time: Some(time),
            resolved: date.map(|d| d * DAY_MS + time),
        })
    }

    /// True when the marker was given a time and therefore filters.
    pub const fn is_set(&self) -> bool {
        self.time.is_some()
    }

    /// Absolute value, once known.
    pub const fn resolved(&self) -> Option<i64> {
        self.resolved
    }

    fn resolve(&mut self, ts: i64) -> Option<i64> {
        if self.resolved.is_none() {
            let time = self.time?;
            let date = *self.date.get_or_insert(ts.div_euclid(DAY_MS));
            self.resolved = Some(date * DAY_MS + time);
        }
        self.resolved
    }

    /// `ts` is at or after the marker, or the marker is unset.
    pub fn is_after_or_no_filter(&mut self, ts: i64) -> bool {
        self.resolve(ts).is_none_or(|marker| ts >= marker)
    }

    /// `ts` is at or before the marker, or the marker is unset.
    pub fn is_before_or_no_filter(&mut self, ts: i64) -> bool {
        self.resolve(ts).is_none_or(|marker| ts <= marker)
    }
}

impl FromStr for TimeWindowMarker {
    type Err = TimeWindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A `START..END` window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: TimeWindowMarker,
    pub end: TimeWindowMarker,
}

impl TimeWindow {
    pub fn parse(text: &str) -> Result<Self, TimeWindowError> {
        let (start, end) = text
            .split_once("..")
            .ok_or_else(|| TimeWindowError::MissingSeparator(text.to_string()))?;
        Ok(Self {
            start: TimeWindowMarker::parse(start)?,
            end: TimeWindowMarker::parse(end)?,
        })
    }

    /// True when neither side filters.
    pub const fn is_open(&self) -> bool {
        !self.start.is_set() && !self.end.is_set()
    }

    pub fn contains(&mut self, ts: i64) -> bool {
        self.start.is_after_or_no_filter(ts) && self.end.is_before_or_no_filter(ts)
    }
}

impl FromStr for TimeWindow {
    type Err = TimeWindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logline::parse_timestamp;

    fn at(hour: i64, minute: i64, second: i64) -> i64 {
        hour * HOUR_MS + minute * MINUTE_MS + second * SECOND_MS
    }

    #[test]
    fn after_filter_on_inferred_day() {
        let mut marker = TimeWindowMarker::parse("12:00:12").unwrap();
        assert!(marker.is_after_or_no_filter(at(12, 0, 13)));

        let mut marker = TimeWindowMarker::parse("12:00:12").unwrap();
        assert!(!marker.is_after_or_no_filter(at(11, 0, 0)));
    }

    #[test]
    fn date_is_inferred_from_first_comparison() {
        let mut marker = TimeWindowMarker::parse("12:00").unwrap();
        let first = parse_timestamp("11-17 08:00:00.000").unwrap();
        assert!(!marker.is_after_or_no_filter(first));

        // Next day's morning is after noon of the inferred day.
        let next_day = parse_timestamp("11-18 08:00:00.000").unwrap();
        assert!(marker.is_after_or_no_filter(next_day));
        assert_eq!(
            marker.resolved(),
            parse_timestamp("11-17 12:00:00.000")
        );
    }

    #[test]
    fn explicit_date_resolves_immediately() {
        let marker = TimeWindowMarker::parse("11-17/12:00:12.012").unwrap();
        assert_eq!(marker.resolved(), parse_timestamp("11-17 12:00:12.012"));
    }

    #[test]
    fn components_are_optional_in_order() {
        assert!(TimeWindowMarker::parse("7").is_ok());
        assert!(TimeWindowMarker::parse("07:30").is_ok());
        assert!(TimeWindowMarker::parse("07:30:15").is_ok());
        assert!(TimeWindowMarker::parse("07:30:15.250").is_ok());
        assert!(TimeWindowMarker::parse("07:30.250").is_err());
        assert!(TimeWindowMarker::parse("11-17/").is_err());
        assert!(TimeWindowMarker::parse("noon").is_err());
        assert!(matches!(
            TimeWindowMarker::parse("25:00"),
            Err(TimeWindowError::OutOfRange(_))
        ));
    }

    #[test]
    fn empty_marker_never_filters() {
        let mut marker = TimeWindowMarker::parse("").unwrap();
        assert!(!marker.is_set());
        assert!(marker.is_after_or_no_filter(0));
        assert!(marker.is_before_or_no_filter(i64::MAX));
    }

    #[test]
    fn window_clips_both_sides() {
        let mut window: TimeWindow = "11-17/12:00:12.012..11-17/13:00:00".parse().unwrap();
        let ts = |s: &str| parse_timestamp(s).unwrap();
        assert!(!window.contains(ts("11-17 12:00:12.011")));
        assert!(window.contains(ts("11-17 12:00:12.012")));
        assert!(window.contains(ts("11-17 12:30:00.000")));
        assert!(window.contains(ts("11-17 13:00:00.000")));
        assert!(!window.contains(ts("11-17 13:00:00.001")));
    }

    #[test]
    fn window_sides_may_be_empty() {
        let window = TimeWindow::parse("12:00..").unwrap();
        assert!(window.start.is_set());
        assert!(!window.end.is_set());
        assert!(TimeWindow::parse("..").unwrap().is_open());
    }

    #[test]
    fn window_requires_separator() {
        assert_eq!(
            TimeWindow::parse("12:00"),
            Err(TimeWindowError::MissingSeparator("12:00".to_string()))
        );
    }
}
