use std::path::PathBuf;
use tempfile::tempdir;
use crate::config::SiftConfig;
use crate::constants::*;

#[test]
fn test_default_config_is_valid() {
    let config = SiftConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.processing.max_line_bytes, BYTES_PER_MB);
    assert_eq!(config.io.output_file_name, "limpos.txt");
    assert_eq!(config.classifier.required_suffix, ".br");
    assert!(config.classifier.denied_domains.contains(&"gmail.com".to_string()));
}

#[test]
fn test_scratch_directory_defaults_under_input() {
    let config = SiftConfig::default().with_input_directory("/data/lists");
    assert_eq!(config.scratch_directory(), PathBuf::from("/data/lists/temp"));
    assert_eq!(config.output_path(), PathBuf::from("/data/lists/limpos.txt"));

    let mut config = config;
    config.io.scratch_directory = Some(PathBuf::from("/fast/scratch"));
    assert_eq!(config.scratch_directory(), PathBuf::from("/fast/scratch"));
}

#[test]
fn test_config_validation() {
    let mut config = SiftConfig::default();

    config.processing.max_line_bytes = 10;
    assert!(config.validate().is_err());
    config.processing.max_line_bytes = DEFAULT_MAX_LINE_BYTES;

    config.processing.max_concurrent_files = 0;
    assert!(config.validate().is_err());
    config.processing.max_concurrent_files = 1000;
    assert!(config.validate().is_err());
    config.processing.max_concurrent_files = 2;

    config.processing.max_open_buckets = 1;
    assert!(config.validate().is_err());
    config.processing.max_open_buckets = 2;
    assert!(config.validate().is_err(), "must leave one writer idle");
    config.processing.max_open_buckets = 3;
    assert!(config.validate().is_ok());
    config.processing.max_open_buckets = 100_000;
    assert!(config.validate().is_err());
    config.processing.max_open_buckets = DEFAULT_MAX_OPEN_BUCKETS;

    config.processing.merge_parallelism = 0;
    assert!(config.validate().is_err());
    config.processing.merge_parallelism = 4;

    config.io.output_file_name = "nested/out.txt".to_string();
    assert!(config.validate().is_err());
    config.io.output_file_name = String::new();
    assert!(config.validate().is_err());
    config.io.output_file_name = "out.txt".to_string();

    config.io.line_suffix = String::new();
    assert!(config.validate().is_err());
    config.io.line_suffix = ".lst".to_string();

    config.logging.verbosity = "chatty".to_string();
    assert!(config.validate().is_err());
    config.logging.verbosity = "verbose".to_string();

    assert!(config.validate().is_ok());
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");

    let mut config = SiftConfig::default();
    config.processing.max_concurrent_files = 7;
    config.classifier.required_suffix = ".pt".to_string();
    config.to_file(&path).unwrap();

    let loaded = SiftConfig::from_file(&path).unwrap();
    assert_eq!(loaded.processing.max_concurrent_files, 7);
    assert_eq!(loaded.classifier.required_suffix, ".pt");
}

#[test]
fn test_partial_config_uses_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "processing": { "max_concurrent_files": 3 } }"#).unwrap();

    let loaded = SiftConfig::from_file(&path).unwrap();
    assert_eq!(loaded.processing.max_concurrent_files, 3);
    assert_eq!(loaded.processing.max_line_bytes, DEFAULT_MAX_LINE_BYTES);
    assert_eq!(loaded.io.line_suffix, ".txt");
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "processing": { "max_line_bytes": 1 } }"#).unwrap();
    assert!(SiftConfig::from_file(&path).is_err());
}
