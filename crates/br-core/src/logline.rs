//! Classification of raw logcat lines.
//!
//! Three fixed-column layouts are recognised:
//!
//! - `Std`: `MM-DD HH:MM:SS.mmm L/TAG(  PID): MSG`
//! - `Brat` (`logcat -v threadtime`): `MM-DD HH:MM:SS.mmm   PID   TID L TAG     : MSG`
//! - `Short` (bare `logcat`): `L/TAG(  PID): MSG`
//!
//! Timestamps are composite sort keys built from month, day and time of day,
//! not wall-clock instants. A month is assumed to have 31 days so keys stay
//! monotonic across month boundaries.

use std::fmt;

use serde::Serialize;

pub const SECOND_MS: i64 = 1000;
pub const MINUTE_MS: i64 = 60 * SECOND_MS;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Step used to fabricate timestamps for `Short` lines.
const SHORT_FORMAT_STEP_MS: i64 = 10;

/// Length of `MM-DD HH:MM:SS.mmm`.
const TIMESTAMP_LEN: usize = 18;

/// Layout a line was parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogFormat {
    Std,
    Brat,
    Short,
    Unknown,
}

impl LogFormat {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Std => "STD",
            Self::Brat => "BRAT",
            Self::Short => "SHORT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity derived from the level character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Verbose,
    Unknown,
}

impl Level {
    pub const fn from_char(c: char) -> Self {
        match c {
            'F' | 'A' => Self::Fatal,
            'E' => Self::Error,
            'W' => Self::Warn,
            'I' => Self::Info,
            'D' => Self::Debug,
            'V' => Self::Verbose,
            _ => Self::Unknown,
        }
    }

    /// Style class used by report renderers.
    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::Fatal => "log-f",
            Self::Error => "log-e",
            Self::Warn => "log-w",
            Self::Info => "log-i",
            Self::Debug => "log-d",
            Self::Verbose => "log-v",
            Self::Unknown => "log-u",
        }
    }
}

/// One classified log line.
///
/// When `ok` is false only `raw` is meaningful; such lines are kept for
/// display but never take part in time-based analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub raw: String,
    pub timestamp: i64,
    pub pid: i32,
    /// Thread id, only present in the `Brat` layout.
    pub tid: i32,
    pub level: char,
    pub tag: String,
    pub message: String,
    pub fields: Vec<String>,
    pub format: LogFormat,
    pub ok: bool,
}

impl LogLine {
    /// A line no layout matched.
    pub fn unparsed(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            timestamp: 0,
            pid: 0,
            tid: 0,
            level: '?',
            tag: String::new(),
            message: String::new(),
            fields: Vec::new(),
            format: LogFormat::Unknown,
            ok: false,
        }
    }

    /// Owned duplicate, for inserting the same line into several views.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub const fn severity(&self) -> Level {
        Level::from_char(self.level)
    }

    pub const fn css_class(&self) -> &'static str {
        self.severity().css_class()
    }
}

type Parser = fn(&str, Option<&LogLine>) -> Option<LogLine>;

/// Layouts in detection order.
const PARSERS: [(LogFormat, Parser); 3] = [
    (LogFormat::Std, try_parse_std),
    (LogFormat::Brat, try_parse_brat),
    (LogFormat::Short, try_parse_short),
];

/// Classifies one raw line. Never fails: unmatched lines come back with
/// `ok == false`.
///
/// `hint` is tried first when given, but the remaining layouts are still
/// attempted on a mismatch, so a stream that switches layout midway keeps
/// parsing. `previous` is the last successfully parsed line and only
/// matters for `Short` lines, which carry no timestamp of their own.
pub fn parse_line(raw: &str, hint: Option<LogFormat>, previous: Option<&LogLine>) -> LogLine {
    let hinted = hint.and_then(|format| PARSERS.iter().find(|(f, _)| *f == format));
    if let Some((_, parser)) = hinted {
        if let Some(line) = parser(raw, previous) {
            return line;
        }
    }

    PARSERS
        .iter()
        .filter(|(format, _)| Some(*format) != hint)
        .find_map(|(_, parser)| parser(raw, previous))
        .unwrap_or_else(|| LogLine::unparsed(raw))
}

/// `MM-DD HH:MM:SS.mmm   PID   TID L TAG     : MSG`
pub fn try_parse_brat(raw: &str, _previous: Option<&LogLine>) -> Option<LogLine> {
    let timestamp = parse_timestamp(raw)?;
    let bytes = raw.as_bytes();
    if bytes.len() < 34
        || bytes[18] != b' '
        || bytes[24] != b' '
        || bytes[30] != b' '
        || bytes[32] != b' '
    {
        return None;
    }
    let pid = parse_padded_number(raw.get(19..24)?)?;
    let tid = parse_padded_number(raw.get(25..30)?)?;
    let level = level_at(bytes, 31)?;

    let rest = raw.get(33..)?;
    let colon = rest.find(':')?;
    let tag = rest[..colon].trim_end();
    let message = rest[colon + 1..].strip_prefix(' ').unwrap_or(&rest[colon + 1..]);

    let mut line = build(raw, LogFormat::Brat, timestamp, pid, level, tag, message);
    line.tid = tid;
    Some(line)
}

/// `MM-DD HH:MM:SS.mmm L/TAG(  PID): MSG`
pub fn try_parse_std(raw: &str, _previous: Option<&LogLine>) -> Option<LogLine> {
    let timestamp = parse_timestamp(raw)?;
    let bytes = raw.as_bytes();
    if bytes.len() < 22 || bytes[18] != b' ' || bytes[20] != b'/' {
        return None;
    }
    let level = level_at(bytes, 19)?;
    let (tag, pid, message) = split_tag_pid_message(raw.get(21..)?)?;
    Some(build(raw, LogFormat::Std, timestamp, pid, level, tag, message))
}

/// `L/TAG(  PID): MSG`, with a fabricated timestamp just after `previous`.
pub fn try_parse_short(raw: &str, previous: Option<&LogLine>) -> Option<LogLine> {
    let bytes = raw.as_bytes();
    if bytes.len() < 4 || bytes[1] != b'/' {
        return None;
    }
    let level = level_at(bytes, 0)?;
    let (tag, pid, message) = split_tag_pid_message(raw.get(2..)?)?;
    let timestamp = previous.map_or(0, |p| p.timestamp + SHORT_FORMAT_STEP_MS);
    Some(build(raw, LogFormat::Short, timestamp, pid, level, tag, message))
}

fn build(
    raw: &str,
    format: LogFormat,
    timestamp: i64,
    pid: i32,
    level: char,
    tag: &str,
    message: &str,
) -> LogLine {
    LogLine {
        raw: raw.to_string(),
        timestamp,
        pid,
        tid: 0,
        level,
        tag: tag.trim_end().to_string(),
        message: message.to_string(),
        fields: split_fields(message),
        format,
        ok: true,
    }
}

/// `[a,b,c]` becomes `["a", "b", "c"]`; anything else is a single field.
fn split_fields(message: &str) -> Vec<String> {
    match message
        .strip_prefix('[')
        .and_then(|m| m.strip_suffix(']'))
    {
        Some(inner) if inner.contains(',') => inner.split(',').map(String::from).collect(),
        _ => vec![message.to_string()],
    }
}

/// Splits `TAG(  PID): MSG`.
fn split_tag_pid_message(body: &str) -> Option<(&str, i32, &str)> {
    let close = body.find("):")?;
    let open = body[..close].rfind('(')?;
    if open == 0 {
        return None;
    }
    let pid = parse_padded_number(&body[open + 1..close])?;
    let message = &body[close + 2..];
    let message = message.strip_prefix(' ').unwrap_or(message);
    Some((&body[..open], pid, message))
}

fn level_at(bytes: &[u8], index: usize) -> Option<char> {
    let b = *bytes.get(index)?;
    b.is_ascii_uppercase().then_some(char::from(b))
}

/// Right-aligned decimal, leading spaces allowed.
fn parse_padded_number(text: &str) -> Option<i32> {
    let digits = text.trim_start();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn digits_at(bytes: &[u8], start: usize, len: usize) -> Option<i64> {
    bytes.get(start..start + len)?.iter().try_fold(0i64, |acc, b| {
        b.is_ascii_digit().then(|| acc * 10 + i64::from(b - b'0'))
    })
}

/// Parses the leading `MM-DD HH:MM:SS.mmm` into a sort key.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let bytes = raw.as_bytes();
    if bytes.len() < TIMESTAMP_LEN
        || bytes[2] != b'-'
        || bytes[5] != b' '
        || bytes[8] != b':'
        || bytes[11] != b':'
        || bytes[14] != b'.'
    {
        return None;
    }
    let month = digits_at(bytes, 0, 2)?;
    let day = digits_at(bytes, 3, 2)?;
    let hour = digits_at(bytes, 6, 2)?;
    let minute = digits_at(bytes, 9, 2)?;
    let second = digits_at(bytes, 12, 2)?;
    let millis = digits_at(bytes, 15, 3)?;

    Some(
        (month * 31 + day) * DAY_MS
            + hour * HOUR_MS
            + minute * MINUTE_MS
            + second * SECOND_MS
            + millis,
    )
}

/// Renders a sort key back as `MM-DD HH:MM:SS.mmm`.
pub fn format_timestamp(ts: i64) -> String {
    let date = ts.div_euclid(DAY_MS);
    let time = ts.rem_euclid(DAY_MS);
    format!(
        "{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
        date / 31,
        date % 31,
        time / HOUR_MS,
        time % HOUR_MS / MINUTE_MS,
        time % MINUTE_MS / SECOND_MS,
        time % SECOND_MS,
    )
}
