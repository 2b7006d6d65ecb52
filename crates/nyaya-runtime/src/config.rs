//! Runtime configuration.
//!
//! Loaded once at startup from an optional YAML file, then environment
//! overrides, then validated. The result is read-only for the life of
//! the process and passed explicitly to whatever needs it.
//!
//! ```yaml
//! provider:
//!   type: openrouter          # or huggingface
//!   model: deepseek/deepseek-chat
//! gateway:
//!   timeout: 60s
//!   max_retries: 2
//! fan_out:
//!   concurrency: 4
//! cache:
//!   enabled: true
//!   max_entries: 1000
//!   ttl: 1h
//! circuit_breaker:
//!   failure_threshold: 5
//!   recovery_timeout: 30s
//!   success_threshold: 1
//! services:
//!   pdftotext: pdftotext
//!   tts_url: http://localhost:5002/tts
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::cache::{CacheConfig, CompletionCache};
use crate::gateway::{CompletionGateway, GatewayConfig};
use crate::orchestrator::RuntimeError;
use crate::providers::{LlmProvider, ProviderRegistry};
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig};

/// Errors loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Serde adapter for durations written as "30s", "1m 30s", "1h".
pub(crate) mod humantime_duration {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(text.trim()).map_err(D::Error::custom)
    }
}

/// Which backend to use and how to reach it.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Registered provider type name
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Model name; the backend default when absent
    pub model: Option<String>,

    pub base_url: Option<String>,

    /// Falls back to the backend's environment variable when absent
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: "openrouter".to_string(),
            model: None,
            base_url: None,
            api_key: None,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider_type", &self.provider_type)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ProviderConfig {
    /// The model to request, falling back to the backend default.
    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default_model(&self.provider_type).to_string())
    }

    /// The section as handed to a [`ProviderFactory`](crate::providers::ProviderFactory).
    pub fn factory_config(&self) -> JsonValue {
        let mut section = serde_json::Map::new();
        section.insert("model".to_string(), JsonValue::String(self.resolved_model()));
        if let Some(url) = &self.base_url {
            section.insert("base_url".to_string(), JsonValue::String(url.clone()));
        }
        if let Some(key) = &self.api_key {
            section.insert("api_key".to_string(), JsonValue::String(key.clone()));
        }
        JsonValue::Object(section)
    }
}

fn default_model(provider_type: &str) -> &'static str {
    match provider_type {
        "huggingface" => "Qwen/Qwen2.5-7B-Instruct",
        _ => "deepseek/deepseek-chat",
    }
}

/// Backend-specific model override variable.
fn model_env(provider_type: &str) -> Option<&'static str> {
    match provider_type {
        "openrouter" => Some("DEEPSEEK_MODEL"),
        "huggingface" => Some("HF_MODEL_NAME"),
        _ => None,
    }
}

/// Per-clause fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FanOutConfig {
    /// Clause calls in flight at once
    pub concurrency: usize,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

/// Boundary collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Program used for PDF text extraction
    pub pdftotext: String,

    /// Speech synthesis endpoint; speech is disabled when absent
    pub tts_url: Option<String>,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            pdftotext: "pdftotext".to_string(),
            tts_url: None,
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub provider: ProviderConfig,
    pub gateway: GatewayConfig,
    pub fan_out: FanOutConfig,
    pub cache: CacheConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub services: ServicesConfig,
}

impl RuntimeConfig {
    /// Load from `path` (or defaults), apply environment overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply `NYAYA_PROVIDER`, then `NYAYA_MODEL` or the backend's own
    /// model variable.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(provider) = lookup("NYAYA_PROVIDER") {
            self.provider.provider_type = provider.trim().to_lowercase();
        }

        let model = lookup("NYAYA_MODEL")
            .or_else(|| model_env(&self.provider.provider_type).and_then(|name| lookup(name)));
        if let Some(model) = model {
            self.provider.model = Some(model.trim().to_string());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.provider_type.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.type must not be empty".to_string()));
        }
        if self.fan_out.concurrency == 0 {
            return Err(ConfigError::Invalid("fan_out.concurrency must be at least 1".to_string()));
        }
        if self.gateway.timeout.is_zero() {
            return Err(ConfigError::Invalid("gateway.timeout must be positive".to_string()));
        }
        if self.circuit_breaker.failure_threshold == 0 || self.circuit_breaker.success_threshold == 0 {
            return Err(ConfigError::Invalid(
                "circuit_breaker thresholds must be at least 1".to_string(),
            ));
        }
        if let Some(url) = &self.services.tts_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid(
                    "services.tts_url must start with http:// or https://".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Validate the provider section against `registry` and build the gateway.
    ///
    /// A missing credential is an error here, so it stops startup.
    pub fn build_gateway(&self, registry: &ProviderRegistry) -> Result<CompletionGateway, RuntimeError> {
        let provider_type = self.provider.provider_type.as_str();
        let section = self.provider.factory_config();

        registry.validate(provider_type, &section)?;
        let provider = registry.create(provider_type, &section)?;

        tracing::info!(
            provider = provider_type,
            model = %self.provider.resolved_model(),
            cache = self.cache.enabled,
            "Completion gateway configured"
        );

        Ok(self.gateway_for(provider))
    }

    /// A gateway over an already-built provider, using this config's
    /// model, timing, cache and breaker settings.
    pub fn gateway_for(&self, provider: Arc<dyn LlmProvider>) -> CompletionGateway {
        CompletionGateway::new(provider, self.provider.resolved_model())
            .with_config(self.gateway.clone())
            .with_cache(CompletionCache::from_config(&self.cache))
            .with_circuit_breaker(CircuitBreaker::new(self.circuit_breaker.clone()))
    }

    /// [`Self::build_gateway`] wrapped for sharing between agents.
    pub fn build_shared_gateway(&self, registry: &ProviderRegistry) -> Result<Arc<CompletionGateway>, RuntimeError> {
        self.build_gateway(registry).map(Arc::new)
    }
}
