//! OpenAI-compatible chat completions backends.
//!
//! OpenRouter and the Hugging Face router speak the same `/chat/completions`
//! protocol and differ only in base URL, credential variable and default
//! model. A [`Backend`] preset selects between them.

use super::{
    factory::ProviderFactory,
    secrets::{ApiCredential, CredentialSource},
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

/// Title sent to OpenRouter for attribution.
const APP_TITLE: &str = "Nyaya Legal Assistant";

/// A chat completions service preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    OpenRouter,
    HuggingFace,
}

impl Backend {
    pub fn provider_type(&self) -> &'static str {
        match self {
            Backend::OpenRouter => "openrouter",
            Backend::HuggingFace => "huggingface",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Backend::OpenRouter => "https://openrouter.ai/api/v1",
            Backend::HuggingFace => "https://router.huggingface.co/v1",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Backend::OpenRouter => "OPENROUTER_API_KEY",
            Backend::HuggingFace => "HUGGINGFACEHUB_API_TOKEN",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Backend::OpenRouter => "deepseek/deepseek-chat",
            Backend::HuggingFace => "Qwen/Qwen2.5-7B-Instruct",
        }
    }

    fn credential_name(&self) -> &'static str {
        match self {
            Backend::OpenRouter => "OpenRouter API key",
            Backend::HuggingFace => "Hugging Face API token",
        }
    }
}

/// A chat completions client for one [`Backend`].
pub struct ChatCompletionsProvider {
    backend: Backend,
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for ChatCompletionsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsProvider")
            .field("backend", &self.backend)
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ChatCompletionsProvider {
    pub fn new(backend: Backend, api_key: impl Into<String>) -> Self {
        Self {
            backend,
            credential: ApiCredential::new(
                api_key,
                CredentialSource::Programmatic,
                backend.credential_name(),
            ),
            base_url: backend.default_base_url().to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from a provider config section, falling back to the backend's
    /// environment variable for the key.
    pub fn from_config(backend: Backend, config: &JsonValue) -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_config_or_env(
            config,
            "api_key",
            backend.api_key_env(),
            backend.credential_name(),
        )?;

        let base_url = config["base_url"]
            .as_str()
            .filter(|url| !url.is_empty())
            .unwrap_or(backend.default_base_url())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            backend,
            credential,
            base_url,
            client: reqwest::Client::new(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Pull a readable message out of an error body.
///
/// Both services answer `{"error": {"message": ...}}`; Hugging Face
/// sometimes sends `{"error": "..."}` instead.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<JsonValue>(body) {
        Ok(value) => {
            let error = &value["error"];
            error["message"]
                .as_str()
                .or_else(|| error.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string())
        }
        Err(_) => body.to_string(),
    }
}

fn into_completion(body: ChatResponse, requested_model: &str) -> CompletionResponse {
    let (content, stop_reason) = body
        .choices
        .into_iter()
        .next()
        .map(|choice| (choice.message.content.unwrap_or_default(), choice.finish_reason))
        .unwrap_or_default();

    let usage = body
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    CompletionResponse {
        content,
        usage,
        model: body.model.unwrap_or_else(|| requested_model.to_string()),
        stop_reason,
    }
}

#[async_trait]
impl LlmProvider for ChatCompletionsProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = ChatRequest {
            model: &config.model,
            messages: &messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        let mut builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.credential.expose())
            .timeout(config.timeout)
            .json(&request);
        if self.backend == Backend::OpenRouter {
            builder = builder.header("X-Title", APP_TITLE);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(config.timeout)
            } else {
                ProviderError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::AuthError);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(into_completion(body, &config.model))
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        self.backend.provider_type()
    }
}

/// Factory for one chat completions [`Backend`].
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "sk-or-...",            // Optional, falls back to the backend's env variable
///   "base_url": "https://..."          // Optional, custom API endpoint
/// }
/// ```
pub struct ChatCompletionsFactory {
    backend: Backend,
}

impl ChatCompletionsFactory {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

impl ProviderFactory for ChatCompletionsFactory {
    fn provider_type(&self) -> &'static str {
        self.backend.provider_type()
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(ChatCompletionsProvider::from_config(self.backend, config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        let env = self.backend.api_key_env();
        if !ApiCredential::is_available(config, "api_key", env) {
            return Err(ProviderError::NotConfigured(format!(
                "{} required: set 'api_key' in config or {} env",
                self.backend.credential_name(),
                env
            )));
        }

        if let Some(url) = config["base_url"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({
            "model": self.backend.default_model(),
            "base_url": self.backend.default_base_url(),
        })
    }

    fn description(&self) -> &'static str {
        match self.backend {
            Backend::OpenRouter => "OpenRouter chat completions",
            Backend::HuggingFace => "Hugging Face router chat completions",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_presets() {
        assert_eq!(Backend::OpenRouter.provider_type(), "openrouter");
        assert_eq!(Backend::OpenRouter.api_key_env(), "OPENROUTER_API_KEY");
        assert_eq!(Backend::HuggingFace.default_model(), "Qwen/Qwen2.5-7B-Instruct");
        assert_eq!(Backend::HuggingFace.api_key_env(), "HUGGINGFACEHUB_API_TOKEN");
    }

    #[test]
    fn test_endpoint_from_config() {
        let config = serde_json::json!({
            "api_key": "key",
            "base_url": "https://proxy.example.com/v1/"
        });
        let provider = ChatCompletionsProvider::from_config(Backend::OpenRouter, &config).unwrap();
        assert_eq!(provider.endpoint(), "https://proxy.example.com/v1/chat/completions");
        assert_eq!(provider.credential.source(), CredentialSource::Config);
    }

    #[test]
    fn test_default_endpoint() {
        let provider = ChatCompletionsProvider::new(Backend::HuggingFace, "hf_token");
        assert_eq!(provider.endpoint(), "https://router.huggingface.co/v1/chat/completions");
        assert_eq!(provider.name(), "huggingface");
    }

    #[tokio::test]
    async fn test_health_check_needs_a_key() {
        assert!(ChatCompletionsProvider::new(Backend::OpenRouter, "sk-or-key").health_check().await);
        assert!(!ChatCompletionsProvider::new(Backend::OpenRouter, "").health_check().await);
    }

    #[test]
    fn test_response_decoding() {
        let body: ChatResponse = serde_json::from_str(
            r#"{
                "id": "gen-1",
                "model": "deepseek/deepseek-chat",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"a\": 1}"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 120, "completion_tokens": 8, "total_tokens": 128}
            }"#,
        )
        .unwrap();
        let completion = into_completion(body, "requested");
        assert_eq!(completion.content, "{\"a\": 1}");
        assert_eq!(completion.usage.total(), 128);
        assert_eq!(completion.model, "deepseek/deepseek-chat");
        assert_eq!(completion.stop_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_response_without_choices_is_empty() {
        let body: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let completion = into_completion(body, "requested");
        assert!(completion.content.is_empty());
        assert_eq!(completion.model, "requested");
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error": {"message": "No credits", "code": 402}}"#),
            "No credits"
        );
        assert_eq!(error_message(r#"{"error": "Model is loading"}"#), "Model is loading");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let request = ChatRequest {
            model: "m",
            messages: &messages,
            temperature: 0.2,
            max_tokens: 1024,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert_eq!(value["max_tokens"], 1024);
    }

    #[test]
    fn test_factory_validation() {
        let factory = ChatCompletionsFactory::new(Backend::OpenRouter);
        assert!(factory
            .validate_config(&serde_json::json!({"api_key": "k", "base_url": "ftp://x"}))
            .is_err());
        assert!(factory.validate_config(&serde_json::json!({"api_key": "k"})).is_ok());
        assert_eq!(factory.default_config()["model"], "deepseek/deepseek-chat");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret = "sk-or-v1-super-secret-key-12345";
        let provider = ChatCompletionsProvider::new(Backend::OpenRouter, secret);
        let debug = format!("{:?}", provider);
        assert!(!debug.contains(secret), "API key was exposed in Debug output!");
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_health_check_requires_key() {
        assert!(ChatCompletionsProvider::new(Backend::OpenRouter, "k").health_check().await);
        assert!(!ChatCompletionsProvider::new(Backend::OpenRouter, "").health_check().await);
    }
}
