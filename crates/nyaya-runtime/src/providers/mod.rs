//! Text completion backends.
//!
//! Agents never talk to a backend directly; they go through the
//! [`CompletionGateway`](crate::gateway::CompletionGateway), which wraps one
//! [`LlmProvider`]. Concrete backends speak the OpenAI-compatible chat
//! completions protocol (OpenRouter, Hugging Face router) and are enabled
//! by cargo features.
//!
//! ## Security
//!
//! Providers hold their API key as an [`ApiCredential`], which never
//! appears in `Debug` or `Display` output.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod secrets;

#[cfg(any(feature = "openrouter", feature = "huggingface"))]
mod chat_completions;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(any(feature = "openrouter", feature = "huggingface"))]
pub use chat_completions::{Backend, ChatCompletionsFactory, ChatCompletionsProvider};

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Provider returned an empty completion")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. } | ProviderError::Timeout(_) => true,
            ProviderError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Per-call sampling and transport settings.
///
/// The gateway fills this from [`CompletionRequest`](crate::gateway::CompletionRequest)
/// and its own config; providers only read it.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "deepseek/deepseek-chat".to_string(),
            max_tokens: 1024,
            temperature: 0.2,
            timeout: Duration::from_secs(60),
        }
    }
}

/// One turn of a chat-completions conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// "system", "user" or "assistant"
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role("assistant", content)
    }
}

/// A finished completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: TokenUsage,

    /// Model the backend actually served, which may differ from the one requested
    pub model: String,

    /// Finish reason reported by the backend
    pub stop_reason: Option<String>,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A chat-completions backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Cheap readiness check; must not spend tokens.
    async fn health_check(&self) -> bool;

    /// Name used in logs and the status endpoint.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_creation() {
        let system = ChatMessage::system("You are a legal document assistant.");
        assert_eq!(system.role, "system");

        let user = ChatMessage::user("Summarize this lease.");
        assert_eq!(user.role, "user");

        let assistant = ChatMessage::assistant("{}");
        assert_eq!(assistant.role, "assistant");
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_transient_errors() {
        assert!(ProviderError::RateLimited { retry_after: None }.is_transient());
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(ProviderError::ApiError { status: 503, message: String::new() }.is_transient());
        assert!(!ProviderError::ApiError { status: 400, message: String::new() }.is_transient());
        assert!(!ProviderError::AuthError.is_transient());
        assert!(!ProviderError::EmptyResponse.is_transient());
    }
}
