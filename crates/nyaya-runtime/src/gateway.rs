//! The completion gateway every agent calls through.
//!
//! One request is one prompt plus an optional system instruction and
//! sampling parameters; the answer is the completion text. Around the
//! provider call the gateway applies, in order: the agent's circuit
//! breaker, the completion cache, a timeout with optional retries for
//! transient failures, and usage accounting.

use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::agents::AgentKind;
use crate::cache::{CacheKey, CompletionCache};
use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
};
use crate::resilience::{CircuitBreaker, LlmUsage, UsageTracker};

/// Default sampling temperature for structured output.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Default completion length.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Errors from the gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Circuit open for {0} agent")]
    CircuitOpen(AgentKind),

    #[error("Completion timed out after {0:?}")]
    Timeout(Duration),
}

/// Gateway timing and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Per-attempt timeout
    #[serde(with = "crate::config::humantime_duration")]
    pub timeout: Duration,

    /// Extra attempts for rate-limit, timeout and 5xx failures
    pub max_retries: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retries: 0,
        }
    }
}

/// One completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(self.prompt.clone()));
        messages
    }
}

/// Shared completion gateway.
pub struct CompletionGateway {
    provider: Arc<dyn LlmProvider>,
    model: String,
    config: GatewayConfig,
    cache: Option<CompletionCache>,
    breaker: CircuitBreaker,
    usage: UsageTracker,
}

impl CompletionGateway {
    /// A gateway without cache, with default timing and breaker settings.
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            config: GatewayConfig::default(),
            cache: None,
            breaker: CircuitBreaker::default(),
            usage: UsageTracker::new(),
        }
    }

    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cache(mut self, cache: Option<CompletionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn health_check(&self) -> bool {
        self.provider.health_check().await
    }

    /// Usage since startup.
    pub fn usage(&self) -> LlmUsage {
        self.usage.snapshot()
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Complete `request` on behalf of `agent`.
    pub async fn complete(
        &self,
        agent: AgentKind,
        request: CompletionRequest,
    ) -> Result<String, GatewayError> {
        let Some(_permit) = self.breaker.try_acquire(agent) else {
            tracing::debug!(agent = %agent, "Circuit open, skipping completion");
            return Err(GatewayError::CircuitOpen(agent));
        };

        let key = CacheKey::new(
            &self.model,
            request.system.as_deref(),
            &request.prompt,
            request.temperature,
            request.max_tokens,
        );
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key).await {
                self.usage.record_cache_hit();
                tracing::debug!(agent = %agent, cached = true, "Completion served from cache");
                return Ok(hit);
            }
        }

        let config = CompletionConfig {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            timeout: self.config.timeout,
        };
        let messages = request.messages();
        let started = Instant::now();

        match self.call_with_retry(agent, &messages, &config).await {
            Ok(response) => {
                self.breaker.record_success(agent);
                self.usage.record_call(response.usage);
                tracing::debug!(
                    agent = %agent,
                    model = %response.model,
                    cached = false,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    tokens = response.usage.total(),
                    "Completion succeeded"
                );
                if let Some(cache) = &self.cache {
                    cache.insert(key, response.content.clone()).await;
                }
                Ok(response.content)
            }
            Err(error) => {
                self.breaker.record_failure(agent);
                self.usage.record_failure();
                tracing::warn!(
                    agent = %agent,
                    model = %self.model,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "Completion failed"
                );
                Err(match error {
                    ProviderError::Timeout(after) => GatewayError::Timeout(after),
                    other => GatewayError::Provider(other),
                })
            }
        }
    }

    async fn call_with_retry(
        &self,
        agent: AgentKind,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let provider = self.provider.as_ref();
        let attempt = move || async move { call_once(provider, messages, config).await };

        attempt
            .retry(ExponentialBuilder::default().with_max_times(self.config.max_retries))
            .when(ProviderError::is_transient)
            .notify(|error: &ProviderError, delay: Duration| {
                tracing::info!(agent = %agent, error = %error, delay_ms = delay.as_millis() as u64, "Retrying completion");
            })
            .await
    }
}

async fn call_once(
    provider: &dyn LlmProvider,
    messages: &[ChatMessage],
    config: &CompletionConfig,
) -> Result<CompletionResponse, ProviderError> {
    let response = tokio::time::timeout(config.timeout, provider.complete(messages.to_vec(), config))
        .await
        .map_err(|_| ProviderError::Timeout(config.timeout))??;

    if response.content.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(response)
}

impl std::fmt::Debug for CompletionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionGateway")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("config", &self.config)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A scripted in-process provider for agent tests.

    use super::*;
    use crate::providers::TokenUsage;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    type Script = dyn Fn(&[ChatMessage]) -> Result<String, ProviderError> + Send + Sync;

    /// Answers each call by running a closure over the messages.
    pub struct ScriptedProvider {
        script: Box<Script>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedProvider {
        pub fn new(
            script: impl Fn(&[ChatMessage]) -> Result<String, ProviderError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                script: Box::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Always answer `text`.
        pub fn constant(text: &'static str) -> Self {
            Self::new(move |_| Ok(text.to_string()))
        }

        /// Always fail.
        pub fn failing() -> Self {
            Self::new(|_| {
                Err(ProviderError::ApiError {
                    status: 400,
                    message: "scripted failure".to_string(),
                })
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
            config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            let answer = (self.script)(&messages);
            self.calls.lock().push(messages);
            answer.map(|content| CompletionResponse {
                usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: (content.len() / 4) as u32,
                },
                content,
                model: config.model.clone(),
                stop_reason: Some("stop".to_string()),
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// The user prompt of a call.
    pub fn prompt_of(messages: &[ChatMessage]) -> &str {
        messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    /// The system instruction of a call.
    pub fn system_of(messages: &[ChatMessage]) -> &str {
        messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    /// A gateway over `provider` without cache.
    pub fn gateway(provider: Arc<ScriptedProvider>) -> Arc<CompletionGateway> {
        Arc::new(CompletionGateway::new(provider, "test-model"))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::resilience::CircuitBreakerConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_complete_sends_system_and_prompt() {
        let provider = Arc::new(ScriptedProvider::constant("answer"));
        let gateway = CompletionGateway::new(provider.clone(), "m");

        let text = gateway
            .complete(
                AgentKind::Qa,
                CompletionRequest::new("question").with_system("be brief"),
            )
            .await
            .unwrap();

        assert_eq!(text, "answer");
        let calls = provider.calls();
        assert_eq!(system_of(&calls[0]), "be brief");
        assert_eq!(prompt_of(&calls[0]), "question");
        assert_eq!(gateway.usage().calls, 1);
    }

    #[tokio::test]
    async fn test_empty_completion_is_failure() {
        let provider = Arc::new(ScriptedProvider::constant("   \n"));
        let gateway = CompletionGateway::new(provider, "m");

        let err = gateway
            .complete(AgentKind::Risk, CompletionRequest::new("p"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Provider(ProviderError::EmptyResponse)));
        assert_eq!(gateway.usage().failures, 1);
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_requests() {
        let provider = Arc::new(ScriptedProvider::constant("cached answer"));
        let gateway = CompletionGateway::new(provider.clone(), "m")
            .with_cache(Some(CompletionCache::default()));

        for _ in 0..3 {
            let text = gateway
                .complete(AgentKind::Simplify, CompletionRequest::new("same"))
                .await
                .unwrap();
            assert_eq!(text, "cached answer");
        }

        assert_eq!(provider.call_count(), 1);
        assert_eq!(gateway.usage().cache_hits, 2);
    }

    #[tokio::test]
    async fn test_circuit_opens_per_agent() {
        let provider = Arc::new(ScriptedProvider::failing());
        let gateway = CompletionGateway::new(provider.clone(), "m").with_circuit_breaker(
            CircuitBreaker::new(CircuitBreakerConfig {
                failure_threshold: 2,
                ..Default::default()
            }),
        );

        for _ in 0..2 {
            assert!(gateway
                .complete(AgentKind::Risk, CompletionRequest::new("p"))
                .await
                .is_err());
        }
        let err = gateway
            .complete(AgentKind::Risk, CompletionRequest::new("p"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::CircuitOpen(AgentKind::Risk)));
        assert_eq!(provider.call_count(), 2);

        // Other agents still reach the provider
        let _ = gateway
            .complete(AgentKind::Legal, CompletionRequest::new("p"))
            .await;
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let provider = Arc::new(ScriptedProvider::new(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ProviderError::RateLimited { retry_after: None })
            } else {
                Ok("second try".to_string())
            }
        }));
        let gateway = CompletionGateway::new(provider, "m").with_config(GatewayConfig {
            max_retries: 2,
            ..Default::default()
        });

        let text = gateway
            .complete(AgentKind::Document, CompletionRequest::new("p"))
            .await
            .unwrap();
        assert_eq!(text, "second try");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failures_are_not_retried() {
        let provider = Arc::new(ScriptedProvider::new(|_| Err(ProviderError::AuthError)));
        let gateway = CompletionGateway::new(provider.clone(), "m").with_config(GatewayConfig {
            max_retries: 3,
            ..Default::default()
        });

        let err = gateway
            .complete(AgentKind::Document, CompletionRequest::new("p"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Provider(ProviderError::AuthError)));
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_request_defaults() {
        let request = CompletionRequest::new("p");
        assert_eq!(request.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(request.messages().len(), 1);
        assert_eq!(request.with_system("s").messages()[0].role, "system");
    }
}
