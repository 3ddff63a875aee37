//! Tests for atomic TOML config writes

use lomap_common::config::{load_toml_config, write_toml_config, LoggingConfig, TomlConfig};
use std::path::PathBuf;
use tempfile::TempDir;

fn sample_config() -> TomlConfig {
    TomlConfig {
        root_folder: Some(PathBuf::from("/srv/lomap")),
        logging: LoggingConfig::default(),
        port: None,
        gemini_api_key: Some("key123".to_string()),
        gemini_model: Some("gemini-2.5-flash".to_string()),
    }
}

#[test]
fn test_atomic_write_leaves_no_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("map-search.toml");

    write_toml_config(&sample_config(), &target).unwrap();

    assert!(target.exists());
    assert!(!temp_dir.path().join("map-search.toml.tmp").exists());

    let content = std::fs::read_to_string(&target).unwrap();
    assert!(content.contains("gemini_api_key"));
    assert!(content.contains("key123"));
}

#[test]
fn test_write_then_load_preserves_fields() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("nested").join("map-search.toml");

    write_toml_config(&sample_config(), &target).unwrap();
    let loaded = load_toml_config(&target).unwrap();

    assert_eq!(loaded, sample_config());
}

#[cfg(unix)]
#[test]
fn test_atomic_write_sets_permissions_0600() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("map-search.toml");

    write_toml_config(&sample_config(), &target).unwrap();

    let mode = std::fs::metadata(&target).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
