//! Configuration loading and management.

use std::path::{Path, PathBuf};

use br_core::DEFAULT_LOG_SECTIONS;
use br_core::section::PARTIAL_FILE_HEADER;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where `br export` writes sections.
    pub output_dir: PathBuf,

    /// Fallback section name for partial inputs.
    pub partial_section: String,

    /// Sections parsed as logs, in order.
    pub log_sections: Vec<String>,

    /// Default time window, e.g. `12:00..13:00`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("br-out"),
            partial_section: PARTIAL_FILE_HEADER.to_string(),
            log_sections: DEFAULT_LOG_SECTIONS.iter().map(|s| (*s).to_string()).collect(),
            time_window: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (BR_*)
        figment = figment.merge(Env::prefixed("BR_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for br.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("br"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses_standard_logs() {
        let config = Config::default();
        assert_eq!(config.log_sections[0], "SYSTEM LOG");
        assert_eq!(config.partial_section, "PARTIAL FILE HEADER");
        assert!(config.time_window.is_none());
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("br.toml");
        std::fs::write(
            &path,
            "output_dir = \"/tmp/sections\"\nlog_sections = [\"EVENT LOG\"]\ntime_window = \"12:00..\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/sections"));
        assert_eq!(config.log_sections, vec!["EVENT LOG"]);
        assert_eq!(config.time_window.as_deref(), Some("12:00.."));
        assert_eq!(config.partial_section, "PARTIAL FILE HEADER");
    }
}
