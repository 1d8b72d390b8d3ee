//! Splits a raw dump into named sections.
//!
//! A full bugreport starts with a four line header:
//!
//! ```text
//! ==============================================
//! == dumpstate: 2012-11-17 12:34:56
//! ==============================================
//! <anything>
//! ```
//!
//! followed by sections opened with `------ NAME ------` markers, or with a
//! divider line followed by a title line. Dropbox crash snippets (first line
//! `Process: ...`) and partial inputs are handled separately.

use std::io::BufRead;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use thiserror::Error;

use crate::metadata::guess_metadata;
use crate::run::{DumpKind, IngestRun};
use crate::section::{PARTIAL_FILE_HEADER, SMAPS_OF_ALL_PROCESSES, SYSTEM_LOG, VM_TRACES_AT_LAST_ANR};

/// Horizontal rule used by dumpsys between services.
pub const DIVIDER: &str =
    "-------------------------------------------------------------------------------";

/// Title that some vendors print before the real provider title.
const ACTIVITY_PREAMBLE: &str = "DUMP OF SERVICE activity:";

const DROPBOX_PREFIX: &str = "Process: ";
const DUMPSTATE_PREFIX: &str = "== dumpstate";
const SHOW_MAP_PREFIX: &str = "SHOW MAP ";
const BANNER_MIN_LEN: usize = 14;
const MAX_SKIPPED_HEADER_LINES: usize = 5;

const KIND_CERTAIN: u32 = 100;
const KIND_FORCED: u32 = 50;

static DUMP_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}").unwrap());

#[derive(Debug, Error)]
pub enum SplitError {
    /// The input does not start like a bugreport.
    #[error("invalid bugreport header at line {line}: {reason}")]
    Format { line: usize, reason: &'static str },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How to treat the input.
#[derive(Debug, Clone, Default)]
pub struct SplitOptions {
    /// Skip header validation; lines outside any section go to a section
    /// with this name.
    pub partial: Option<String>,
}

impl SplitOptions {
    pub fn partial(fallback_section: impl Into<String>) -> Self {
        Self {
            partial: Some(fallback_section.into()),
        }
    }

    /// Partial mode with the standard fallback section.
    pub fn partial_default() -> Self {
        Self::partial(PARTIAL_FILE_HEADER)
    }
}

/// Reads `reader` to the end, appending sections and header lines to `run`.
///
/// Sections read before an I/O error stay in `run`.
pub fn split_sections<R: BufRead>(
    mut reader: R,
    run: &mut IngestRun,
    options: &SplitOptions,
) -> Result<(), SplitError> {
    let mut splitter = Splitter::new(run, options.partial.as_deref());
    let mut buf = Vec::new();

    while read_line(&mut reader, &mut buf)? {
        let line = decode(&buf);
        splitter.line_no += 1;
        if splitter.line_no == 1 && line.starts_with(DROPBOX_PREFIX) {
            tracing::debug!("dropbox file detected");
            split_dropbox(line, reader, splitter.run)?;
            guess_metadata(run);
            return Ok(());
        }
        splitter.feed(&line)?;
    }
    splitter.finish()?;

    if options.partial.is_some() {
        run.kind.set(DumpKind::Partial, KIND_FORCED);
    } else {
        run.kind.set(DumpKind::Bugreport, KIND_CERTAIN);
    }
    guess_metadata(run);
    Ok(())
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<bool> {
    buf.clear();
    Ok(reader.read_until(b'\n', buf)? > 0)
}

/// Dumps routinely contain bytes that are not UTF-8; they never abort a run.
fn decode(buf: &[u8]) -> String {
    let text = String::from_utf8_lossy(buf);
    text.trim_end_matches(['\n', '\r']).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderState {
    /// `matched` lines of the four line header seen so far.
    Scanning { matched: usize, skipped: usize },
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingTitle {
    None,
    /// A divider was seen; the next line names the section.
    Expected,
    /// The activity preamble was seen; the next line is the real title.
    AfterPreamble,
}

struct Splitter<'a> {
    run: &'a mut IngestRun,
    partial: Option<&'a str>,
    header: HeaderState,
    title: PendingTitle,
    in_section: bool,
    line_no: usize,
}

impl<'a> Splitter<'a> {
    fn new(run: &'a mut IngestRun, partial: Option<&'a str>) -> Self {
        let header = if partial.is_some() {
            HeaderState::Done
        } else {
            HeaderState::Scanning {
                matched: 0,
                skipped: 0,
            }
        };
        Self {
            run,
            partial,
            header,
            title: PendingTitle::None,
            in_section: false,
            line_no: 0,
        }
    }

    fn feed(&mut self, line: &str) -> Result<(), SplitError> {
        match self.header {
            HeaderState::Scanning { matched, skipped } => self.feed_header(line, matched, skipped),
            HeaderState::Done => {
                self.feed_body(line);
                Ok(())
            }
        }
    }

    fn finish(&self) -> Result<(), SplitError> {
        if let HeaderState::Scanning { .. } = self.header {
            return Err(self.format_error("input ended inside the dumpstate header"));
        }
        Ok(())
    }

    const fn format_error(&self, reason: &'static str) -> SplitError {
        SplitError::Format {
            line: self.line_no,
            reason,
        }
    }

    fn feed_header(&mut self, line: &str, matched: usize, skipped: usize) -> Result<(), SplitError> {
        self.sniff_dump_time(line);
        self.header = match matched {
            0 if is_banner(line) => HeaderState::Scanning {
                matched: 1,
                skipped,
            },
            0 if skipped < MAX_SKIPPED_HEADER_LINES => {
                tracing::trace!(line, "skipping noise before header");
                HeaderState::Scanning {
                    matched,
                    skipped: skipped + 1,
                }
            }
            0 => return Err(self.format_error("no dumpstate banner found")),
            1 if line.starts_with(DUMPSTATE_PREFIX) => HeaderState::Scanning {
                matched: 2,
                skipped,
            },
            1 => return Err(self.format_error("expected '== dumpstate' after banner")),
            2 if is_banner(line) => HeaderState::Scanning {
                matched: 3,
                skipped,
            },
            2 => return Err(self.format_error("expected closing banner")),
            _ => HeaderState::Done,
        };
        self.run.push_header(line);
        Ok(())
    }

    fn sniff_dump_time(&mut self, line: &str) {
        if self.run.dump_time.is_some() {
            return;
        }
        let parsed = DUMP_TIME_RE
            .find(line)
            .and_then(|m| NaiveDateTime::parse_from_str(m.as_str(), "%Y-%m-%d %H:%M:%S").ok());
        if let Some(ts) = parsed {
            tracing::debug!(%ts, "dump time found in header");
            self.run.dump_time = Some(ts);
        }
    }

    fn feed_body(&mut self, line: &str) {
        match self.title {
            PendingTitle::None => {}
            PendingTitle::Expected if line == ACTIVITY_PREAMBLE => {
                self.title = PendingTitle::AfterPreamble;
                return;
            }
            PendingTitle::Expected | PendingTitle::AfterPreamble => {
                if marker_name(line).is_none() {
                    let title = title_name(line);
                    if !title.is_empty() {
                        self.title = PendingTitle::None;
                        self.open(title);
                    }
                    return;
                }
                // A regular marker names the section itself.
                self.title = PendingTitle::None;
            }
        }

        if let Some(pos) = line.find(DIVIDER) {
            if pos > 0 {
                // Divider glued to the end of the previous output.
                self.append(&line[..pos]);
                self.feed_body(&line[pos..]);
                return;
            }
        }

        if line == DIVIDER {
            self.title = PendingTitle::Expected;
            return;
        }

        if let Some(name) = marker_name(line) {
            if name.contains(" was the duration of '") {
                tracing::trace!(name, "dropping section footer");
            } else if self.in_smaps() && name.starts_with(SHOW_MAP_PREFIX) {
                self.append(line);
            } else {
                self.open(name);
            }
            return;
        }

        self.append(line);
    }

    fn in_smaps(&self) -> bool {
        self.in_section
            && self
                .run
                .sections()
                .last()
                .is_some_and(|s| s.short_name() == SMAPS_OF_ALL_PROCESSES)
    }

    fn open(&mut self, name: &str) {
        self.run.new_section(name);
        self.in_section = true;
    }

    fn append(&mut self, line: &str) {
        if !self.in_section {
            if let Some(fallback) = self.partial {
                self.open(fallback);
            } else {
                self.run.push_header(line);
                return;
            }
        }
        if let Some(section) = self.run.last_section_mut() {
            section.push_line(line);
        }
    }
}

/// `------ NAME ------` yields `NAME`.
fn marker_name(line: &str) -> Option<&str> {
    let name = line
        .strip_prefix("------ ")?
        .strip_suffix(" ------")?
        .trim();
    (!name.is_empty()).then_some(name)
}

fn is_banner(line: &str) -> bool {
    line.len() >= BANNER_MIN_LEN && line.bytes().all(|b| b == b'=')
}

/// Title line after a divider, without its trailing colon.
fn title_name(line: &str) -> &str {
    let line = line.trim();
    line.strip_suffix(':').unwrap_or(line)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropboxState {
    Header,
    Log,
    Trace,
}

/// Header until the first blank line, then the system log until the next
/// blank line, then a stack trace until the end.
fn split_dropbox<R: BufRead>(
    first: String,
    mut reader: R,
    run: &mut IngestRun,
) -> Result<(), SplitError> {
    run.kind.set(DumpKind::Dropbox, KIND_CERTAIN);
    run.push_header(first);
    let log_id = run.new_section(SYSTEM_LOG).id();
    let trace_id = run.new_section(VM_TRACES_AT_LAST_ANR).id();

    let mut state = DropboxState::Header;
    let mut buf = Vec::new();
    while read_line(&mut reader, &mut buf)? {
        let line = decode(&buf);
        let blank = line.trim().is_empty();
        match state {
            DropboxState::Header if blank => state = DropboxState::Log,
            DropboxState::Header => run.push_header(line),
            DropboxState::Log if blank => state = DropboxState::Trace,
            DropboxState::Log => push_to(run, log_id, line),
            DropboxState::Trace => push_to(run, trace_id, line),
        }
    }
    Ok(())
}

fn push_to(run: &mut IngestRun, id: u32, line: String) {
    if let Some(section) = run.section_by_id_mut(id) {
        section.push_line(line);
    }
}
