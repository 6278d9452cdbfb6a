//! Session configuration.
//!
//! Loaded from a JSON file; every field is optional and falls back to its
//! default. Boolean options can also be changed at runtime with the console
//! `setoption` command.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Ask before ending a move phase in which nothing moved.
    pub confirm_empty_done: bool,
    /// Print the move list after every change.
    pub echo_ledger: bool,
    /// Name of the UI queue thread.
    pub ui_thread_name: String,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            confirm_empty_done: true,
            echo_ledger: false,
            ui_thread_name: "ui".to_string(),
            log_filter: "warn".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Applies a `setoption`. Returns false for unknown names or values.
    pub fn set_option(&mut self, name: &str, value: Option<&str>) -> bool {
        let flag = match value.map(str::trim) {
            None | Some("true") | Some("on") => true,
            Some("false") | Some("off") => false,
            Some(_) => return false,
        };
        match name {
            "ConfirmEmptyDone" => self.confirm_empty_done = flag,
            "EchoLedger" => self.echo_ledger = flag,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        assert_eq!(SessionConfig::from_json("{}").unwrap(), SessionConfig::default());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config =
            SessionConfig::from_json(r#"{"echo_ledger": true, "log_filter": "turnkeeper=debug"}"#)
                .unwrap();
        assert!(config.echo_ledger);
        assert!(config.confirm_empty_done);
        assert_eq!(config.log_filter, "turnkeeper=debug");
        assert_eq!(config.ui_thread_name, "ui");
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            SessionConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SessionConfig::load(Path::new("/nonexistent/turnkeeper.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/turnkeeper.json"));
    }

    #[test]
    fn set_option_flags() {
        let mut config = SessionConfig::default();
        assert!(config.set_option("ConfirmEmptyDone", Some("false")));
        assert!(!config.confirm_empty_done);
        assert!(config.set_option("EchoLedger", None));
        assert!(config.echo_ledger);
        assert!(!config.set_option("EchoLedger", Some("maybe")));
        assert!(!config.set_option("Threads", Some("4")));
    }
}
