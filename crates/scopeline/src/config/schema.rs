use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Defaults to `~/.scopeline/data/scopeline.db` when absent.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Estimation columns every item is estimated over.
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub references: ReferencesConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_columns() -> Vec<String> {
    vec![
        "analysis".to_string(),
        "development".to_string(),
        "testing".to_string(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencesConfig {
    /// Cap on reference summaries embedded into the generation prompt.
    #[serde(default = "default_max_count")]
    pub max_count: usize,
}

fn default_max_count() -> usize {
    5
}

impl Default for ReferencesConfig {
    fn default() -> Self {
        Self {
            max_count: default_max_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Cap on document characters embedded into the generation prompt.
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,
}

fn default_max_document_chars() -> usize {
    12_000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_document_chars: default_max_document_chars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config = serde_json::from_str(r#"{"version": "1.0"}"#).unwrap();
        assert_eq!(config.version, "1.0");
        assert!(config.worker_count >= 1);
        assert_eq!(config.columns.len(), 3);
        assert_eq!(config.gateway.base_url, "http://localhost:11434");
        assert_eq!(config.gateway.timeout_secs, 300);
        assert_eq!(config.references.max_count, 5);
        assert_eq!(config.generation.max_document_chars, 12_000);
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "version": "1.0",
                "worker_count": 2,
                "columns": ["design", "build"],
                "gateway": {"base_url": "http://models:11434", "model": "qwen", "timeout_secs": 60}
            }"#,
        )
        .unwrap();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.columns, vec!["design", "build"]);
        assert_eq!(config.gateway.model, "qwen");
        assert_eq!(config.gateway.timeout_secs, 60);
    }
}
