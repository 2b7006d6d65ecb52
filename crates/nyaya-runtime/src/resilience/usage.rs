//! Process-wide model usage accounting.

use parking_lot::Mutex;
use serde::Serialize;

use crate::providers::TokenUsage;

/// Cumulative usage since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LlmUsage {
    /// Completed provider calls
    pub calls: u64,

    /// Provider calls that failed
    pub failures: u64,

    /// Requests answered from the completion cache
    pub cache_hits: u64,

    pub prompt_tokens: u64,

    pub completion_tokens: u64,
}

impl LlmUsage {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Shared accumulator behind the gateway.
#[derive(Debug, Default)]
pub struct UsageTracker {
    usage: Mutex<LlmUsage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&self, tokens: TokenUsage) {
        let mut usage = self.usage.lock();
        usage.calls += 1;
        usage.prompt_tokens += u64::from(tokens.prompt_tokens);
        usage.completion_tokens += u64::from(tokens.completion_tokens);
    }

    pub fn record_failure(&self) {
        self.usage.lock().failures += 1;
    }

    pub fn record_cache_hit(&self) {
        self.usage.lock().cache_hits += 1;
    }

    pub fn snapshot(&self) -> LlmUsage {
        *self.usage.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_accumulates() {
        let tracker = UsageTracker::new();
        tracker.record_call(TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 20,
        });
        tracker.record_call(TokenUsage {
            prompt_tokens: 50,
            completion_tokens: 5,
        });
        tracker.record_cache_hit();
        tracker.record_failure();

        let usage = tracker.snapshot();
        assert_eq!(usage.calls, 2);
        assert_eq!(usage.total_tokens(), 175);
        assert_eq!(usage.cache_hits, 1);
        assert_eq!(usage.failures, 1);
    }
}
