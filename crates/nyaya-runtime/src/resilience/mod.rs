//! Resilience around the completion gateway.
//!
//! - [`CircuitBreaker`]: fail fast per agent after repeated errors
//! - [`UsageTracker`]: cumulative calls, tokens and cache hits

mod circuit_breaker;
mod usage;

pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use usage::{LlmUsage, UsageTracker};
