//! In-memory cache of completions.
//!
//! Identical requests (same model, system prompt, prompt and sampling
//! parameters) are answered from memory, so re-analyzing a document or
//! re-asking a question does not pay for a second model call.

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    pub max_entries: u64,

    #[serde(with = "crate::config::humantime_duration")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Cache key for one completion request.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct CacheKey {
    model: String,
    system_hash: u64,
    prompt_hash: u64,
    temperature_bits: u32,
    max_tokens: u32,
}

impl CacheKey {
    pub fn new(
        model: &str,
        system: Option<&str>,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.to_string(),
            system_hash: hash_of(&system),
            prompt_hash: hash_of(prompt),
            temperature_bits: temperature.to_bits(),
            max_tokens,
        }
    }
}

fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Completion cache using moka.
pub struct CompletionCache {
    cache: Cache<CacheKey, String>,
}

impl CompletionCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// Build from config; `None` when caching is disabled.
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.max_entries, config.ttl))
    }

    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, completion: String) {
        self.cache.insert(key, completion).await;
    }
}

impl Default for CompletionCache {
    fn default() -> Self {
        let config = CacheConfig::default();
        Self::new(config.max_entries, config.ttl)
    }
}
