//! Integration tests for layered Settings loading.
//!
//! These tests only use explicit files in temp directories and
//! `CATTREE_*` variables; a global config on the machine would sit
//! below both layers.

use std::env;
use std::fs;
use std::path::PathBuf;

use rstest::rstest;
use tempfile::TempDir;

use cattree::application::ApplicationError;
use cattree::config::Settings;

#[test]
fn given_explicit_file_when_loading_then_overrides_defaults() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cattree.toml");
    fs::write(
        &path,
        r#"
separator = ">"
max_depth = 4
data_file = "/tmp/cattree-test/categories.toml"
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(&path)).expect("load settings");

    // Assert
    assert_eq!(settings.separator, ">");
    assert_eq!(settings.max_depth, 4);
    assert_eq!(
        settings.data_file,
        PathBuf::from("/tmp/cattree-test/categories.toml")
    );
    assert_eq!(settings.rules().max_depth, 4);
    assert_eq!(settings.max_name_length, 60);
}

#[test]
fn given_env_var_when_loading_then_overrides_file() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cattree.toml");
    fs::write(&path, "chunked_load_threshold = 10\n").unwrap();
    env::set_var("CATTREE_CHUNKED_LOAD_THRESHOLD", "42");

    // Act
    let settings = Settings::load(Some(&path));
    env::remove_var("CATTREE_CHUNKED_LOAD_THRESHOLD");

    // Assert
    assert_eq!(settings.unwrap().chunked_load_threshold, 42);
}

#[test]
fn given_missing_explicit_file_when_loading_then_config_error() {
    let temp = TempDir::new().unwrap();

    let result = Settings::load(Some(&temp.path().join("missing.toml")));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[rstest]
#[case("")]
#[case("::")]
#[case(" / ")]
fn given_separator_not_one_character_when_loading_then_config_error(#[case] separator: &str) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cattree.toml");
    fs::write(&path, format!("separator = {separator:?}\n")).unwrap();

    let result = Settings::load(Some(&path));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_env_var_in_data_file_when_loading_then_expands_it() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cattree.toml");
    fs::write(&path, "data_file = \"$CT_TEST_DATA_ROOT/cats.toml\"\n").unwrap();
    env::set_var("CT_TEST_DATA_ROOT", temp.path());

    let settings = Settings::load(Some(&path)).expect("load settings");

    assert_eq!(settings.data_file, temp.path().join("cats.toml"));
}

#[test]
fn given_effective_settings_when_rendering_then_round_trips_through_toml() {
    let temp = TempDir::new().unwrap();
    let settings = Settings::load(None).expect("load defaults");
    let path = temp.path().join("shown.toml");
    fs::write(&path, settings.to_toml().unwrap()).unwrap();

    let reloaded = Settings::load(Some(&path)).expect("reload");

    assert_eq!(reloaded.max_categories, settings.max_categories);
    assert_eq!(reloaded.separator, settings.separator);
}
