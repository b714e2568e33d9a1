use std::collections::HashSet;
use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator =
        jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
            message: format!("Failed to compile JSON schema: {}", e),
        })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| format!("{} at {}", e, e.instance_path()))
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Validate version
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "worker_count must be at least 1".to_string(),
        });
    }

    // Validate estimation columns: non-blank and unique.
    if config.columns.is_empty() {
        return Err(ConfigError::Validation {
            message: "At least one estimation column is required".to_string(),
        });
    }
    let mut seen = HashSet::new();
    for column in &config.columns {
        if column.trim().is_empty() {
            return Err(ConfigError::InvalidColumn {
                name: column.clone(),
                reason: "Column name is blank".to_string(),
            });
        }
        if !seen.insert(column.as_str()) {
            return Err(ConfigError::InvalidColumn {
                name: column.clone(),
                reason: "Duplicate column name".to_string(),
            });
        }
    }

    if !config.gateway.base_url.starts_with("http://")
        && !config.gateway.base_url.starts_with("https://")
    {
        return Err(ConfigError::Validation {
            message: format!(
                "Gateway base_url must be an http(s) URL: {}",
                config.gateway.base_url
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_minimal() {
        let config = load_config_from_str(r#"{"version": "1.0"}"#).unwrap();
        assert_eq!(config.version, "1.0");
    }

    #[test]
    fn test_rejects_unknown_version() {
        let result = load_config_from_str(r#"{"version": "2.0"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_top_level_key() {
        let result = load_config_from_str(r#"{"version": "1.0", "surprise": true}"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let result = load_config_from_str(
            r#"{"version": "1.0", "columns": ["dev", "dev"]}"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidColumn { .. })));
    }

    #[test]
    fn test_rejects_blank_column() {
        let result = load_config_from_str(r#"{"version": "1.0", "columns": ["dev", "  "]}"#);
        assert!(matches!(result, Err(ConfigError::InvalidColumn { .. })));
    }

    #[test]
    fn test_rejects_non_http_gateway_url() {
        let result = load_config_from_str(
            r#"{"version": "1.0", "gateway": {"base_url": "ftp://models"}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let result = load_config_from_str(r#"{"version": "1.0", "worker_count": 0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"version": "1.0", "worker_count": 2}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.worker_count, 2);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = load_config("/nonexistent/config.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
