//! Shared helpers for command implementations.

use anyhow::{Context, Result};
use br_core::{IngestRun, SplitError, SplitOptions, TimeWindow, split_sections};

use crate::{Config, InputArgs, input};

/// Certainty of a file name taken from the input path.
const FILE_NAME_FROM_PATH: u32 = 10;

/// Reads and splits the dump named by `args`.
pub fn load_run(args: &InputArgs, config: &Config) -> Result<IngestRun> {
    let reader = input::open(&args.file)?;
    let options = match &args.partial {
        None => SplitOptions::default(),
        Some(name) => SplitOptions::partial(
            name.clone()
                .unwrap_or_else(|| config.partial_section.clone()),
        ),
    };

    let mut run = IngestRun::new();
    if let Some(stem) = input::dump_stem(&args.file) {
        run.file_name.set(stem, FILE_NAME_FROM_PATH);
    }

    match split_sections(reader, &mut run, &options) {
        Ok(()) => {}
        Err(err @ SplitError::Format { .. }) => {
            return Err(err).with_context(|| {
                format!(
                    "{} is not a full bugreport (use --partial to read it anyway)",
                    args.file.display()
                )
            });
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", args.file.display()));
        }
    }

    tracing::debug!(
        sections = run.sections().len(),
        kind = %run.kind.value(),
        "split dump"
    );
    Ok(run)
}

/// Command-line window if given, else the configured one, else no filter.
pub fn parse_window(arg: Option<&str>, config: &Config) -> Result<TimeWindow> {
    match arg.or(config.time_window.as_deref()) {
        Some(text) => TimeWindow::parse(text).context("invalid --window"),
        None => Ok(TimeWindow::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    fn args(file: PathBuf, partial: Option<Option<String>>) -> InputArgs {
        InputArgs { file, partial }
    }

    #[test]
    fn bare_log_needs_partial() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("logcat.txt");
        std::fs::write(&path, "11-17 12:00:01.000 I/Foo(  1): x\n").unwrap();
        let config = Config::default();

        let err = load_run(&args(path.clone(), None), &config).unwrap_err();
        assert!(format!("{err:#}").contains("--partial"));

        let run = load_run(&args(path, Some(None)), &config).unwrap();
        assert_eq!(run.sections()[0].display_name(), "PARTIAL FILE HEADER");
        assert_eq!(run.file_name.value(), "logcat");
    }

    #[test]
    fn explicit_partial_section_name() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("logcat.txt");
        std::fs::write(&path, "I/Foo(  1): x\n").unwrap();

        let run = load_run(
            &args(path, Some(Some("SYSTEM LOG".to_string()))),
            &Config::default(),
        )
        .unwrap();
        assert!(run.section("SYSTEM LOG").is_some());
    }

    #[test]
    fn window_falls_back_to_config() {
        let config = Config {
            time_window: Some("12:00..13:00".to_string()),
            ..Config::default()
        };
        assert!(!parse_window(None, &config).unwrap().is_open());
        assert!(parse_window(None, &Config::default()).unwrap().is_open());
        assert!(parse_window(Some("bogus"), &config).is_err());
    }
}
