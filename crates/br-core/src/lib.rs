//! Core parsing logic for Android bugreports.
//!
//! This crate turns a raw dump into typed facts:
//! - Sections: the dump split on its section markers
//! - Log lines: logcat output classified and ordered, with integrity findings
//! - Wait-for graphs: lock waits from stack traces, checked for deadlocks
//!
//! All state of one ingestion lives in an [`IngestRun`].

pub mod finding;
pub mod graph;
pub mod guess;
pub mod integrity;
pub mod logline;
pub mod logs;
mod metadata;
pub mod process;
pub mod run;
pub mod section;
pub mod split;
pub mod traces;
pub mod window;

pub use finding::{Finding, LineRef};
pub use graph::{ThreadGraph, WaitEdge};
pub use guess::GuessedValue;
pub use logline::{Level, LogFormat, LogLine, format_timestamp, parse_line};
pub use logs::{DEFAULT_LOG_SECTIONS, ParsedLog, merge_logs, parse_log, parse_logs};
pub use metadata::guess_metadata;
pub use process::{ProcessRecord, ProcessTable};
pub use run::{DumpKind, IngestRun};
pub use section::Section;
pub use split::{SplitError, SplitOptions, split_sections};
pub use traces::scan_deadlocks;
pub use window::{TimeWindow, TimeWindowError, TimeWindowMarker};
