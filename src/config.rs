//! YAML configuration.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration:
//!
//! ```yaml
//! extract:
//!   heading_min_font_size: 12.0
//!   pdf_line_tolerance: 2.0
//! output:
//!   directory: output
//!   database: document_data.db
//!   backends: [file]
//! logging:
//!   level: info
//! ```
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extract::ExtractConfig;
use crate::storage::BackendKind;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extract: ExtractConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Where results are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Parent directory of the per-document file output
    pub directory: PathBuf,
    /// SQLite database file
    pub database: PathBuf,
    pub backends: Vec<BackendKind>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            database: PathBuf::from("document_data.db"),
            backends: vec![BackendKind::File],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `info` or `docsift=debug`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Read a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&yaml)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_saphyr::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }

    /// Render as YAML, e.g. for `--print-config` style output.
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_saphyr::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml_str("\n  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_yaml_str(
            "output:\n  backends: [file, sqlite]\nlogging:\n  level: debug\n",
        )
        .unwrap();
        assert_eq!(config.output.backends, [BackendKind::File, BackendKind::Sqlite]);
        assert_eq!(config.output.directory, PathBuf::from("output"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.extract, ExtractConfig::default());
    }

    #[test]
    fn test_bad_backend_is_config_error() {
        let err = Config::from_yaml_str("output:\n  backends: [postgres]\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docsift.yaml");
        fs::write(&path, "extract:\n  heading_min_font_size: 16.5\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().extract.heading_min_font_size, 16.5);

        let err = Config::load(dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("missing.yaml"));
    }
}
