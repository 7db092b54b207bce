//! Configuration loading and layer precedence.

use competency::{AppError, Config, LogFormat};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write");
    file
}

// =============================================================================
// FILE LAYER
// =============================================================================

#[test]
fn test_full_file_parsed() {
    let file = config_file(
        r#"
[assessment]
passing_threshold = 80
validity_days = 180

[logging]
format = "json"

[data]
path = "/srv/competency/team.json"
"#,
    );

    let config = Config::load(Some(file.path())).expect("load");
    assert_eq!(config.assessment.passing_threshold, 80);
    assert_eq!(config.assessment.validity_days, 180);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.data_path(), PathBuf::from("/srv/competency/team.json"));
}

#[test]
fn test_missing_explicit_file_is_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.toml");

    let err = Config::load(Some(&missing)).expect_err("missing file");
    assert!(matches!(err, AppError::Io { .. }));
}

#[test]
fn test_unknown_key_rejected() {
    let file = config_file("[assessment]\npassing_treshold = 80\n");

    let err = Config::load(Some(file.path())).expect_err("typo");
    assert!(matches!(err, AppError::ConfigParse { .. }));
}

#[test]
fn test_threshold_above_100_rejected() {
    let file = config_file("[assessment]\npassing_threshold = 101\n");

    let err = Config::load(Some(file.path())).expect_err("threshold");
    assert!(matches!(err, AppError::Config(_)));
    assert_eq!(err.exit_code(), 11);
}

#[test]
fn test_non_positive_validity_rejected() {
    let file = config_file("[assessment]\nvalidity_days = 0\n");

    assert!(matches!(
        Config::load(Some(file.path())),
        Err(AppError::Config(_))
    ));
}

// =============================================================================
// PRECEDENCE
// =============================================================================

#[test]
fn test_env_overrides_file() {
    let file = config_file("[logging]\nformat = \"text\"\n\n[data]\npath = \"file.json\"\n");

    let config = Config::load(Some(file.path()))
        .expect("load")
        .with_env(Some("env.json".to_string()), Some("json".to_string()));

    assert_eq!(config.data_path(), PathBuf::from("env.json"));
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_cli_overrides_env() {
    let config = Config::default()
        .with_env(Some("env.json".to_string()), None)
        .with_cli(Some(PathBuf::from("cli.json")));

    assert_eq!(config.data_path(), PathBuf::from("cli.json"));
}

#[test]
fn test_blank_or_unknown_env_ignored() {
    let config = Config::default().with_env(Some("  ".to_string()), Some("xml".to_string()));

    assert_eq!(config.data_path(), PathBuf::from("competency.json"));
    assert_eq!(config.logging.format, LogFormat::Text);
}

#[test]
fn test_absent_cli_keeps_lower_layers() {
    let config = Config::default()
        .with_env(Some("env.json".to_string()), None)
        .with_cli(None);

    assert_eq!(config.data_path(), PathBuf::from("env.json"));
}
