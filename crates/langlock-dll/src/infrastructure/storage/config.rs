//! TOML-based configuration for the locker library.
//!
//! The library has no UI and no installer, so configuration is an optional
//! file next to the host process:
//!
//! - the path in the `LANGLOCK_CONFIG` environment variable, if set;
//! - otherwise `lang-locker.toml` in the current working directory.
//!
//! A missing file means "all defaults": every detection channel armed and
//! no diagnostic log.  Example:
//!
//! ```toml
//! [logging]
//! level = "debug"
//! file = "langlocker.log"
//!
//! [detectors]
//! message_hook = true
//! shell_hook = true
//! notify_sink = false
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = ...)]` and every section is
//! optional, so a partial file only overrides what it names.

use std::path::{Path, PathBuf};

use langlock_core::DetectorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "LANGLOCK_CONFIG";

/// Config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "lang-locker.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level library configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LockerConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub detectors: DetectorsConfig,
}

/// Diagnostic log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `"info"` or `"lang_locker=debug"`.
    /// Overridden by the `LANGLOCK_LOG` environment variable.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Append-only log file.  No log is written when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Which detection channels are armed on lock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectorsConfig {
    /// `WH_GETMESSAGE` hook on the main thread.
    #[serde(default = "default_true")]
    pub message_hook: bool,
    /// `WH_SHELL` hook.
    #[serde(default = "default_true")]
    pub shell_hook: bool,
    /// Text-services language-profile notification sink.
    #[serde(default = "default_true")]
    pub notify_sink: bool,
}

impl DetectorsConfig {
    /// Kinds of the enabled channels, in arming order.
    pub fn enabled_kinds(&self) -> Vec<DetectorKind> {
        [
            (self.message_hook, DetectorKind::MessageHook),
            (self.shell_hook, DetectorKind::ShellHook),
            (self.notify_sink, DetectorKind::NotifySink),
        ]
        .into_iter()
        .filter_map(|(enabled, kind)| enabled.then_some(kind))
        .collect()
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for DetectorsConfig {
    fn default() -> Self {
        Self {
            message_hook: default_true(),
            shell_hook: default_true(),
            notify_sink: default_true(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Resolves the config file path from the environment.
pub fn config_file_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Loads the configuration from [`config_file_path`].
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<LockerConfig, ConfigError> {
    load_config_from(&config_file_path())
}

/// Loads the configuration from `path`, returning defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<LockerConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LockerConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_arms_all_channels_without_log_file() {
        let cfg = LockerConfig::default();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.file, None);
        assert_eq!(
            cfg.detectors.enabled_kinds(),
            vec![
                DetectorKind::MessageHook,
                DetectorKind::ShellHook,
                DetectorKind::NotifySink
            ]
        );
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: LockerConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, LockerConfig::default());
    }

    #[test]
    fn test_partial_detectors_section_overrides_only_named_fields() {
        // Arrange
        let toml_str = r#"
[detectors]
notify_sink = false
"#;

        // Act
        let cfg: LockerConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert!(cfg.detectors.message_hook);
        assert!(cfg.detectors.shell_hook);
        assert!(!cfg.detectors.notify_sink);
        assert_eq!(
            cfg.detectors.enabled_kinds(),
            vec![DetectorKind::MessageHook, DetectorKind::ShellHook]
        );
    }

    #[test]
    fn test_logging_section_parses_file_and_level() {
        let toml_str = r#"
[logging]
level = "lang_locker=debug"
file = "langlocker.log"
"#;

        let cfg: LockerConfig = toml::from_str(toml_str).expect("deserialize logging");

        assert_eq!(cfg.logging.level, "lang_locker=debug");
        assert_eq!(cfg.logging.file, Some(PathBuf::from("langlocker.log")));
    }

    #[test]
    fn test_absent_log_file_is_omitted_when_serialized() {
        let toml_str = toml::to_string_pretty(&LockerConfig::default()).expect("serialize");
        assert!(!toml_str.contains("file"), "None file must be omitted");
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let result: Result<LockerConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/lang-locker.toml");
        let cfg = load_config_from(&path).expect("missing file is not an error");
        assert_eq!(cfg, LockerConfig::default());
    }

    #[test]
    fn test_config_file_name_is_lang_locker_toml() {
        assert_eq!(CONFIG_FILE_NAME, "lang-locker.toml");
        if std::env::var_os(CONFIG_ENV).is_none() {
            assert_eq!(config_file_path(), PathBuf::from(CONFIG_FILE_NAME));
        }
    }
}
