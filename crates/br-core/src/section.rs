//! Named sections of a bugreport.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Section holding the process/thread dumps taken at the last ANR.
pub const VM_TRACES_AT_LAST_ANR: &str = "VM TRACES AT LAST ANR";
/// Section holding the process/thread dumps taken during dumpstate.
pub const VM_TRACES_JUST_NOW: &str = "VM TRACES JUST NOW";
pub const SYSTEM_LOG: &str = "SYSTEM LOG";
pub const EVENT_LOG: &str = "EVENT LOG";
pub const MAIN_LOG: &str = "MAIN LOG";
pub const RADIO_LOG: &str = "RADIO LOG";
pub const KERNEL_LOG: &str = "KERNEL LOG";
pub const SYSTEM_PROPERTIES: &str = "SYSTEM PROPERTIES";
pub const SMAPS_OF_ALL_PROCESSES: &str = "SMAPS OF ALL PROCESSES";
/// Fallback section used for partial inputs.
pub const PARTIAL_FILE_HEADER: &str = "PARTIAL FILE HEADER";

/// A contiguous, named block of lines from the dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    id: u32,
    display_name: String,
    short_name: String,
    file_name: String,
    lines: Vec<String>,
}

impl Section {
    /// Creates an empty section. The id comes from the owning run.
    pub fn new(id: u32, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        let short_name = short_name_of(&display_name);
        let file_name = format!("{id:03}-{}", sanitize_file_name(&display_name));
        Self {
            id,
            display_name,
            short_name,
            file_name,
            lines: Vec::new(),
        }
    }

    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Full name as it appeared in the marker, e.g. `SYSTEM LOG (logcat -d)`.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Display name cut at the first `(` or `:`, e.g. `SYSTEM LOG`.
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// File name used for the raw export.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True if `name` equals either the display or the short name.
    pub fn is_named(&self, name: &str) -> bool {
        self.display_name == name || self.short_name == name
    }

    /// Writes the lines verbatim, one per line.
    pub fn write_lines<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for line in &self.lines {
            writeln!(writer, "{line}")?;
        }
        Ok(())
    }

    /// Writes the section to `dir/<file_name>` and returns the path.
    pub fn save(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(&self.file_name);
        let mut writer = BufWriter::new(File::create(&path)?);
        self.write_lines(&mut writer)?;
        writer.flush()?;
        Ok(path)
    }
}

fn short_name_of(display_name: &str) -> String {
    let end = display_name
        .find(['(', ':'])
        .unwrap_or(display_name.len());
    display_name[..end].trim().to_string()
}

/// Spaces become `_` and `/` becomes `-`.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' => '_',
            '/' => '-',
            c => c,
        })
        .collect()
}
