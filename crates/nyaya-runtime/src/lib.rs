//! # nyaya-runtime
//!
//! LLM-backed agents and the analysis pipeline for Nyaya.
//!
//! Everything in this crate that touches a model goes through one
//! [`CompletionGateway`], which adds caching, a per-agent circuit breaker,
//! timeouts, optional retries and usage accounting on top of an
//! [`LlmProvider`](providers::LlmProvider).
//!
//! The deterministic half (data model, response extraction, fallbacks)
//! lives in `nyaya-core`. Agents here never fail on the analysis path;
//! they log and fall back to the canonical values from
//! [`nyaya_core::fallback`].
//!
//! ## Features
//!
//! - `openrouter`, `huggingface`: chat completions backends
//! - `all-providers`: both backends
//! - `http-services`: the HTTP speech synthesizer
//!
//! ## Example
//!
//! ```rust,ignore
//! use nyaya_runtime::{AnalysisPipeline, RuntimeConfig, providers::ProviderRegistry};
//!
//! let config = RuntimeConfig::load(None)?;
//! let pipeline = AnalysisPipeline::from_config(&config, &ProviderRegistry::with_defaults())?;
//!
//! let report = pipeline.analyze(&agreement_text).await;
//! for risk in &report.risks.risks {
//!     println!("{}: {}", risk.clause_id, risk.risk_level);
//! }
//! ```

pub mod agents;
pub mod cache;
pub mod config;
pub mod gateway;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod services;

pub use agents::{AgentError, AgentKind};
pub use config::{ConfigError, RuntimeConfig};
pub use gateway::{CompletionGateway, CompletionRequest, GatewayError};
pub use orchestrator::{AnalysisPipeline, AnalysisPipelineBuilder, RuntimeError};
pub use resilience::LlmUsage;
pub use services::{
    Audio, PdfReportRenderer, PdfTextExtractor, PdftotextExtractor, PlainTextReportRenderer,
    RenderedDocument, ReportRenderer, ServiceError, Services, SpeechSynthesizer,
};

#[cfg(feature = "http-services")]
pub use services::HttpSpeechSynthesizer;
