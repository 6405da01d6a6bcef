//! Model invocation for Verdict.
//!
//! Provides a `ModelBackend` trait with implementations for:
//! - **Hugging Face**: hosted text generation via the Inference API
//! - **Scripted**: replays canned completions, no network (tests, offline runs)

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use crate::config::ModelConfig;

/// Env var consulted when no token is configured.
pub const API_TOKEN_ENV: &str = "HF_API_TOKEN";

// ============================================================================
// ModelBackend trait
// ============================================================================

/// Abstraction over text-completion providers.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Complete `prompt`, returning the raw generated text.
    async fn complete(&self, prompt: &str, max_new_tokens: u32) -> Result<String, LlmError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Inference API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Missing API token: set HF_API_TOKEN or [model] api_token")]
    MissingApiKey,

    #[error("Unknown model backend: {0}")]
    UnknownBackend(String),
}

// ============================================================================
// Config
// ============================================================================

/// Hugging Face client configuration
#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub api_token: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl HuggingFaceConfig {
    pub fn new(api_token: Option<String>, model: String) -> Self {
        let api_token = api_token
            .or_else(|| std::env::var(API_TOKEN_ENV).ok())
            .unwrap_or_default();

        Self {
            api_token,
            model,
            temperature: 0.4,
            timeout: Duration::from_secs(60),
        }
    }
}

impl From<&ModelConfig> for HuggingFaceConfig {
    fn from(config: &ModelConfig) -> Self {
        let mut hf = HuggingFaceConfig::new(config.api_token.clone(), config.model.clone());
        hf.temperature = config.temperature;
        hf.timeout = Duration::from_secs(config.timeout_seconds);
        hf
    }
}

/// Create the backend named by `[model] backend`.
pub fn create_backend(config: &ModelConfig) -> Result<Box<dyn ModelBackend>, LlmError> {
    match config.backend.as_str() {
        "huggingface" => Ok(Box::new(HuggingFaceClient::with_base_url(
            HuggingFaceConfig::from(config),
            config.base_url.clone(),
        )?)),
        "scripted" => Ok(Box::new(ScriptedBackend::empty())),
        other => Err(LlmError::UnknownBackend(other.to_string())),
    }
}

// ============================================================================
// Inference API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
}

/// Flatten the two response shapes the Inference API uses.
///
/// `[{"generated_text": ..}]` and `{"generated_text": ..}` yield the text;
/// anything else is rendered as JSON so the interpreter still sees it.
pub fn completion_text(data: Value) -> String {
    let generated = match &data {
        Value::Array(items) => items.first().and_then(|first| first.get("generated_text")),
        Value::Object(obj) => obj.get("generated_text"),
        _ => None,
    };

    match generated {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => data.to_string(),
    }
}

// ============================================================================
// HuggingFaceClient
// ============================================================================

/// Calls the Hugging Face Inference API text-generation endpoint.
#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    client: Client,
    config: HuggingFaceConfig,
    base_url: String,
}

impl HuggingFaceClient {
    pub fn new(config: HuggingFaceConfig) -> Result<Self, LlmError> {
        Self::with_base_url(config, "https://api-inference.huggingface.co".to_string())
    }

    /// Create a client with a custom base URL (for testing / self-hosted endpoints)
    pub fn with_base_url(config: HuggingFaceConfig, base_url: String) -> Result<Self, LlmError> {
        if config.api_token.is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            config,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ModelBackend for HuggingFaceClient {
    async fn complete(&self, prompt: &str, max_new_tokens: u32) -> Result<String, LlmError> {
        let url = format!("{}/models/{}", self.base_url, self.config.model);

        let request = GenerationRequest {
            inputs: prompt,
            parameters: GenerationParameters {
                max_new_tokens,
                temperature: self.config.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(code = status.as_u16(), body = %body, "Inference API error");
            return Err(LlmError::Api {
                code: status.as_u16(),
                message: body,
            });
        }

        let data: Value = response.json().await?;
        let text = completion_text(data);
        tracing::debug!(model = %self.config.model, chars = text.len(), "Completion received");

        Ok(text)
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}

// ============================================================================
// ScriptedBackend
// ============================================================================

/// Replays queued completions in order. Once the queue is empty every call
/// returns the fallback text. Prompts are recorded for inspection.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, (u16, String)>>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new<S: Into<String>>(replies: Vec<S>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            fallback: "{}".to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// No queued replies; every call returns the fallback.
    pub fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Queue a service failure after the replies already queued.
    pub fn with_failure(self, code: u16, message: impl Into<String>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err((code, message.into())));
        }
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn complete(&self, prompt: &str, _max_new_tokens: u32) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err((code, message))) => Err(LlmError::Api { code, message }),
            None => Ok(self.fallback.clone()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.3";

    fn test_config(api_token: &str) -> HuggingFaceConfig {
        HuggingFaceConfig {
            api_token: api_token.to_string(),
            model: MODEL.to_string(),
            temperature: 0.4,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_complete_posts_prompt_and_reads_list_shape() {
        let mock_server = MockServer::start().await;
        let client = HuggingFaceClient::with_base_url(test_config("hf_test"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .and(path(format!("/models/{}", MODEL)))
            .and(header("authorization", "Bearer hf_test"))
            .and(body_json(serde_json::json!({
                "inputs": "Rate this",
                "parameters": { "max_new_tokens": 256, "temperature": 0.4 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "generated_text": "{\"summary\": \"ok\"}" }
            ])))
            .mount(&mock_server)
            .await;

        let result = client.complete("Rate this", 256).await;
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result.err());
        assert_eq!(result.unwrap(), "{\"summary\": \"ok\"}");
    }

    #[tokio::test]
    async fn test_complete_reads_object_shape() {
        let mock_server = MockServer::start().await;
        let client =
            HuggingFaceClient::with_base_url(test_config("hf_test"), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "generated_text": "hello" })),
            )
            .mount(&mock_server)
            .await;

        assert_eq!(client.complete("p", 16).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_complete_returns_api_error_with_status_and_body() {
        let mock_server = MockServer::start().await;
        let client =
            HuggingFaceClient::with_base_url(test_config("hf_test"), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Model is loading"))
            .expect(1)
            .mount(&mock_server)
            .await;

        match client.complete("p", 16).await {
            Err(LlmError::Api { code, message }) => {
                assert_eq!(code, 503);
                assert_eq!(message, "Model is loading");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_times_out_as_http_error() {
        let mock_server = MockServer::start().await;
        let mut config = test_config("hf_test");
        config.timeout = Duration::from_secs(1);
        let client = HuggingFaceClient::with_base_url(config, mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "generated_text": "late" }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        match client.complete("p", 16).await {
            Err(LlmError::Http(e)) => assert!(e.is_timeout(), "Expected timeout, got {:?}", e),
            other => panic!("Expected Http error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_token_fails_before_any_request() {
        match HuggingFaceClient::new(test_config("")) {
            Err(LlmError::MissingApiKey) => {}
            other => panic!("Expected MissingApiKey error, got {:?}", other),
        }
    }

    #[test]
    fn test_completion_text_shapes() {
        assert_eq!(
            completion_text(serde_json::json!([{ "generated_text": "a" }, { "generated_text": "b" }])),
            "a"
        );
        assert_eq!(completion_text(serde_json::json!({ "generated_text": "x" })), "x");
        assert_eq!(
            completion_text(serde_json::json!({ "error": "busy" })),
            r#"{"error":"busy"}"#
        );
        assert_eq!(completion_text(serde_json::json!([])), "[]");
        assert_eq!(completion_text(serde_json::json!("bare")), "\"bare\"");
    }

    #[test]
    fn test_create_backend_rejects_unknown_name() {
        let config = ModelConfig {
            backend: "carrier-pigeon".to_string(),
            ..ModelConfig::default()
        };
        assert!(matches!(
            create_backend(&config),
            Err(LlmError::UnknownBackend(name)) if name == "carrier-pigeon"
        ));
    }

    #[tokio::test]
    async fn test_create_backend_scripted() {
        let config = ModelConfig {
            backend: "scripted".to_string(),
            ..ModelConfig::default()
        };
        let backend = create_backend(&config).unwrap();
        assert_eq!(backend.name(), "scripted");
        assert_eq!(backend.complete("anything", 8).await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_scripted_backend_replays_then_falls_back() {
        let backend = ScriptedBackend::new(vec!["first"])
            .with_failure(500, "boom")
            .with_fallback("done");

        assert_eq!(backend.complete("p1", 8).await.unwrap(), "first");
        assert!(matches!(
            backend.complete("p2", 8).await,
            Err(LlmError::Api { code: 500, .. })
        ));
        assert_eq!(backend.complete("p3", 8).await.unwrap(), "done");
        assert_eq!(backend.prompts(), vec!["p1", "p2", "p3"]);
    }
}
