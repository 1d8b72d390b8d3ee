//! Writes every section of a dump to its own file.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use br_core::IngestRun;

pub fn run<W: Write>(writer: &mut W, run: &IngestRun, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let paths = run
        .export_sections(out_dir)
        .with_context(|| format!("failed to export sections to {}", out_dir.display()))?;

    tracing::debug!(count = paths.len(), dir = %out_dir.display(), "exported sections");
    writeln!(
        writer,
        "Exported {} section(s) to {}",
        paths.len(),
        out_dir.display()
    )?;
    Ok(())
}
