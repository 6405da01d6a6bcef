use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct VerdictConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    /// "huggingface" or "scripted"
    pub backend: String,
    pub base_url: String,
    pub model: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
    /// Falls back to `HF_API_TOKEN` when unset.
    pub api_token: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: "huggingface".to_string(),
            base_url: "https://api-inference.huggingface.co".to_string(),
            model: "mistralai/Mistral-7B-Instruct-v0.3".to_string(),
            max_new_tokens: 256,
            temperature: 0.4,
            timeout_seconds: 60,
            api_token: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "data/feedback_log.csv".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8777,
        }
    }
}

impl VerdictConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<VerdictConfig, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config = from_toml(
            r#"
            [service]
            log_level = "debug"
            "#,
        )
        .expect("minimal config should load");

        assert_eq!(config.service.log_level, "debug");
        assert_eq!(config.model.backend, "huggingface");
        assert_eq!(config.model.max_new_tokens, 256);
        assert_eq!(config.model.timeout_seconds, 60);
        assert!(config.model.api_token.is_none());
        assert_eq!(config.store.path, "data/feedback_log.csv");
        assert!(config.http.enabled);
        assert_eq!(config.http.port, 8777);
    }

    #[test]
    fn test_model_section_overrides() {
        let config = from_toml(
            r#"
            [service]
            log_level = "info"

            [model]
            backend = "scripted"
            base_url = "http://localhost:9000"
            model = "tiny-instruct"
            max_new_tokens = 64
            temperature = 0.1
            timeout_seconds = 5
            api_token = "hf_test"

            [http]
            enabled = false
            host = "0.0.0.0"
            port = 9999
            "#,
        )
        .expect("full config should load");

        assert_eq!(config.model.backend, "scripted");
        assert_eq!(config.model.model, "tiny-instruct");
        assert_eq!(config.model.max_new_tokens, 64);
        assert_eq!(config.model.api_token.as_deref(), Some("hf_test"));
        assert!(!config.http.enabled);
        assert_eq!(config.http.port, 9999);
    }

    #[test]
    fn test_partial_model_section_keeps_other_defaults() {
        let config = from_toml(
            r#"
            [service]
            log_level = "info"

            [model]
            max_new_tokens = 128
            "#,
        )
        .expect("partial model section should load");

        assert_eq!(config.model.max_new_tokens, 128);
        assert_eq!(config.model.model, "mistralai/Mistral-7B-Instruct-v0.3");
        assert!((config.model.temperature - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_service_section_is_an_error() {
        assert!(from_toml("[store]\npath = \"x.csv\"\n").is_err());
    }
}
