//! Integration tests for config file loading.
//!
//! Each test writes its own file into a unique temporary directory so the
//! tests can run in parallel.

use std::path::PathBuf;

use lang_locker::infrastructure::storage::config::{load_config_from, ConfigError, LockerConfig};
use langlock_core::DetectorKind;

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("langlock_cfg_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_full_config_file_is_loaded() {
    // Arrange
    let dir = temp_dir();
    let path = dir.join("lang-locker.toml");
    std::fs::write(
        &path,
        r#"
[logging]
level = "debug"
file = "C:/Temp/langlocker.log"

[detectors]
message_hook = true
shell_hook = false
notify_sink = true
"#,
    )
    .unwrap();

    // Act
    let cfg = load_config_from(&path).expect("load full config");

    // Assert
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(cfg.logging.file, Some(PathBuf::from("C:/Temp/langlocker.log")));
    assert_eq!(
        cfg.detectors.enabled_kinds(),
        vec![DetectorKind::MessageHook, DetectorKind::NotifySink]
    );

    // Cleanup
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_file_in_existing_directory_yields_defaults() {
    let dir = temp_dir();

    let cfg = load_config_from(&dir.join("lang-locker.toml")).expect("defaults");

    assert_eq!(cfg, LockerConfig::default());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_malformed_file_is_a_parse_error() {
    let dir = temp_dir();
    let path = dir.join("lang-locker.toml");
    std::fs::write(&path, "[detectors]\nmessage_hook = \"yes\"\n").unwrap();

    let result = load_config_from(&path);

    assert!(matches!(result, Err(ConfigError::Parse(_))));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_directory_in_place_of_file_is_an_io_error() {
    // Reading a directory fails with something other than NotFound.
    let dir = temp_dir();

    let result = load_config_from(&dir);

    assert!(matches!(result, Err(ConfigError::Io { .. })));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_all_channels_disabled_yields_empty_plan() {
    let dir = temp_dir();
    let path = dir.join("lang-locker.toml");
    std::fs::write(
        &path,
        "[detectors]\nmessage_hook = false\nshell_hook = false\nnotify_sink = false\n",
    )
    .unwrap();

    let cfg = load_config_from(&path).expect("load");

    assert!(cfg.detectors.enabled_kinds().is_empty());
    std::fs::remove_dir_all(&dir).ok();
}
