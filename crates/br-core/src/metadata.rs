//! Guesses dump-wide facts from header lines and system properties.

use crate::run::IngestRun;
use crate::section::SYSTEM_PROPERTIES;

const FROM_BUILD_LINE: u32 = 10;
const FROM_FINGERPRINT: u32 = 20;
const FROM_PROPERTIES: u32 = 100;
const FILE_NAME_FROM_DUMP_TIME: u32 = 5;

/// A single hint about the dump.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Clue {
    Build(String, u32),
    AndroidVersion(String, u32),
}

/// Updates the run's guessed values from what was split so far.
pub fn guess_metadata(run: &mut IngestRun) {
    let mut clues = header_clues(run.header_lines());
    if let Some(props) = run.section(SYSTEM_PROPERTIES) {
        clues.extend(property_clues(props.lines()));
    }

    for clue in clues {
        match clue {
            Clue::Build(value, certainty) => {
                run.build.set(value, certainty);
            }
            Clue::AndroidVersion(value, certainty) => {
                run.android_version.set(value, certainty);
            }
        }
    }

    if let Some(ts) = run.dump_time {
        let name = ts.format("bugreport-%Y-%m-%d-%H-%M-%S").to_string();
        run.file_name.set(name, FILE_NAME_FROM_DUMP_TIME);
    }
}

fn header_clues(lines: &[String]) -> Vec<Clue> {
    let mut clues = Vec::new();
    for line in lines {
        if let Some(fingerprint) = line.strip_prefix("Build fingerprint: ") {
            if let Some(version) = version_from_fingerprint(fingerprint) {
                clues.push(Clue::AndroidVersion(version.to_string(), FROM_FINGERPRINT));
            }
        } else if let Some(build) = line.strip_prefix("Build: ") {
            let build = build.trim();
            if !build.is_empty() {
                clues.push(Clue::Build(build.to_string(), FROM_BUILD_LINE));
            }
            // Dropbox headers carry the fingerprint on the build line.
            if let Some(version) = version_from_fingerprint(build) {
                clues.push(Clue::AndroidVersion(version.to_string(), FROM_FINGERPRINT));
            }
        }
    }
    clues
}

fn property_clues(lines: &[String]) -> Vec<Clue> {
    lines
        .iter()
        .filter_map(|line| parse_property(line))
        .filter_map(|(key, value)| match key {
            "ro.build.version.release" => Some(Clue::AndroidVersion(value.to_string(), FROM_PROPERTIES)),
            "ro.build.display.id" => Some(Clue::Build(value.to_string(), FROM_PROPERTIES)),
            _ => None,
        })
        .collect()
}

/// `[key]: [value]`
fn parse_property(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.trim().split_once("]: [")?;
    let key = key.strip_prefix('[')?;
    let value = value.strip_suffix(']')?;
    Some((key, value))
}

/// `brand/product/device:VERSION/ID/INCREMENTAL:type/tags`
fn version_from_fingerprint(fingerprint: &str) -> Option<&str> {
    let fingerprint = fingerprint.trim().trim_matches('\'');
    let (_, rest) = fingerprint.split_once(':')?;
    let version = rest.split('/').next()?;
    let looks_like_version = !version.is_empty()
        && version.starts_with(|c: char| c.is_ascii_digit())
        && version.chars().all(|c| c.is_ascii_alphanumeric() || c == '.');
    looks_like_version.then_some(version)
}
