//! Configuration loading and validation.

use scopeline::config::{load_config, load_config_from_str};
use scopeline::ConfigError;

#[test]
fn full_config_loads() {
    let config = load_config_from_str(
        r#"{
            "version": "1.0",
            "database_path": "/var/lib/scopeline/scopeline.db",
            "worker_count": 4,
            "columns": ["analysis", "development", "testing", "management"],
            "gateway": {
                "base_url": "http://models.internal:11434",
                "model": "qwen2.5:14b",
                "timeout_secs": 120
            },
            "references": {"max_count": 3},
            "generation": {"max_document_chars": 20000}
        }"#,
    )
    .unwrap();

    assert_eq!(config.worker_count, 4);
    assert_eq!(config.columns.len(), 4);
    assert_eq!(config.gateway.model, "qwen2.5:14b");
    assert_eq!(config.references.max_count, 3);
    assert_eq!(config.generation.max_document_chars, 20_000);
}

#[test]
fn version_is_required() {
    let result = load_config_from_str(r#"{"worker_count": 2}"#);
    assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
}

#[test]
fn empty_columns_rejected() {
    let result = load_config_from_str(r#"{"version": "1.0", "columns": []}"#);
    assert!(result.is_err());
}

#[test]
fn malformed_json_rejected() {
    let result = load_config_from_str("{not json");
    assert!(matches!(result, Err(ConfigError::ParseJson(_))));
}

#[test]
fn load_from_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scopeline.json");
    std::fs::write(
        &path,
        r#"{"version": "1.0", "columns": ["build", "verify"]}"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.columns, vec!["build", "verify"]);
}
