//! Per-invocation ingestion state.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::finding::Finding;
use crate::guess::GuessedValue;
use crate::process::ProcessTable;
use crate::section::Section;

/// What kind of input the dump turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpKind {
    #[default]
    Unknown,
    /// Full `dumpstate` output.
    Bugreport,
    /// Crash snippet collected by the dropbox service.
    Dropbox,
    /// Bare log or partial dumpsys output.
    Partial,
}

impl DumpKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Bugreport => "bugreport",
            Self::Dropbox => "dropbox",
            Self::Partial => "partial",
        }
    }
}

impl fmt::Display for DumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one ingestion produces.
///
/// Section ids are handed out sequentially from 1; nothing here is shared
/// between runs.
#[derive(Debug, Default)]
pub struct IngestRun {
    next_section_id: u32,
    sections: Vec<Section>,
    header: Vec<String>,
    pub kind: GuessedValue<DumpKind>,
    pub file_name: GuessedValue<String>,
    pub android_version: GuessedValue<String>,
    pub build: GuessedValue<String>,
    pub dump_time: Option<NaiveDateTime>,
    pub processes: ProcessTable,
    findings: Vec<Finding>,
}

impl IngestRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new section with the next id and returns it.
    pub fn new_section(&mut self, display_name: &str) -> &mut Section {
        self.next_section_id += 1;
        let section = Section::new(self.next_section_id, display_name);
        tracing::debug!(id = section.id(), name = display_name, "new section");
        self.sections.push(section);
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Looks up a section by display name, then by short name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.section_index(name).map(|i| &self.sections[i])
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.section_index(name).map(|i| &mut self.sections[i])
    }

    /// A section alongside the process table it feeds.
    pub(crate) fn section_with_processes(
        &mut self,
        name: &str,
    ) -> Option<(&Section, &mut ProcessTable)> {
        let index = self.section_index(name)?;
        Some((&self.sections[index], &mut self.processes))
    }

    fn section_index(&self, name: &str) -> Option<usize> {
        self.sections
            .iter()
            .position(|s| s.display_name() == name)
            .or_else(|| self.sections.iter().position(|s| s.is_named(name)))
    }

    pub(crate) fn last_section_mut(&mut self) -> Option<&mut Section> {
        self.sections.last_mut()
    }

    pub(crate) fn section_by_id_mut(&mut self, id: u32) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id() == id)
    }

    /// Lines before the first section.
    pub fn header_lines(&self) -> &[String] {
        &self.header
    }

    pub fn push_header(&mut self, line: impl Into<String>) {
        self.header.push(line.into());
    }

    pub fn add_finding(&mut self, finding: Finding) {
        tracing::debug!(%finding, "finding");
        self.findings.push(finding);
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Writes every section to `dir` as `%03d-NAME`.
    pub fn export_sections(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        self.sections.iter().map(|s| s.save(dir)).collect()
    }
}
