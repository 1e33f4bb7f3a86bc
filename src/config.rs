//! Harvest configuration.
//!
//! Loaded from `~/.harvest/config.toml`, or from the path given with
//! `--config`. Every key is optional:
//!
//! ```toml
//! database = "/var/lib/harvest/harvest.sqlite"
//! timezone = "Asia/Jakarta"
//! harvest-work-type = "harvesting"
//! log-level = "info"
//! log-format = "json"
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engine::EngineConfig;

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Harvest configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Database file. Defaults to `~/.harvest/harvest.sqlite`.
    pub database: Option<PathBuf>,

    /// IANA time zone that decides what "today" is.
    /// The system zone is used when unset.
    pub timezone: Option<String>,

    /// Work type attached to harvest work assignments.
    pub harvest_work_type: String,

    /// Default log filter; `RUST_LOG` takes precedence.
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            timezone: None,
            harvest_work_type: EngineConfig::default().harvest_work_type,
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load config from `explicit`, or from `~/.harvest/config.toml`.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, String> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        let contents = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound && explicit.is_none() => {
                return Ok(Self::default());
            }
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        Self::parse(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(contents).map_err(|e| e.to_string())?;

        if config.harvest_work_type.trim().is_empty() {
            return Err("harvest-work-type must not be empty".to_string());
        }

        Ok(config)
    }

    /// The config file path: `~/.harvest/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".harvest").join("config.toml"))
    }

    /// The database path: the configured one, or the default location.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database
            .clone()
            .or_else(crate::storage::Storage::default_path)
    }

    /// The settings the engine needs.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            harvest_work_type: self.harvest_work_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.harvest_work_type, "harvesting");
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn parses_kebab_case_keys() {
        let config = Config::parse(
            r#"
            database = "/tmp/farm.sqlite"
            timezone = "Asia/Jakarta"
            harvest-work-type = "panen"
            log-level = "debug"
            log-format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.database, Some(PathBuf::from("/tmp/farm.sqlite")));
        assert_eq!(config.timezone.as_deref(), Some("Asia/Jakarta"));
        assert_eq!(config.engine().harvest_work_type, "panen");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_unknown_keys_and_blank_work_type() {
        assert!(Config::parse("default-identity = \"x\"").is_err());
        assert!(Config::parse("harvest-work-type = \" \"").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(err.starts_with("failed to read"));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "log-level = \"warn\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.database, None);
    }
}
