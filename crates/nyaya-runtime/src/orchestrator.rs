//! The multi-agent analysis pipeline.
//!
//! One analysis runs the agents in a fixed order:
//! - document structuring first, since every other agent reads its clauses
//! - legal mapping, simplification and risk concurrently via `tokio::join!`
//! - next steps last, informed by the mapping and the risks
//!
//! Every stage is total, so `analyze` always produces a report.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use nyaya_core::integrity::is_aligned;
use nyaya_core::{AnalysisReport, ChatAnswer, DocumentInfo, REPORT_DISCLAIMER};

use crate::agents::{
    AgentError, DocumentAgent, LegalAgent, NextStepsAgent, QaAgent, RiskAgent, SimplifyAgent,
    TranslateAgent,
};
use crate::config::{ConfigError, RuntimeConfig};
use crate::gateway::CompletionGateway;
use crate::providers::{LlmProvider, ProviderError, ProviderRegistry};
use crate::resilience::LlmUsage;

/// Errors constructing the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Runs full analyses, questions and translations over one gateway.
pub struct AnalysisPipeline {
    gateway: Arc<CompletionGateway>,
    document: DocumentAgent,
    legal: LegalAgent,
    simplify: SimplifyAgent,
    risk: RiskAgent,
    next_steps: NextStepsAgent,
    qa: QaAgent,
    translator: TranslateAgent,
}

impl AnalysisPipeline {
    /// Agents sharing `gateway`, with per-clause calls bounded by `concurrency`.
    pub fn new(gateway: Arc<CompletionGateway>, concurrency: usize) -> Self {
        Self {
            document: DocumentAgent::new(gateway.clone()),
            legal: LegalAgent::new(gateway.clone()),
            simplify: SimplifyAgent::new(gateway.clone(), concurrency),
            risk: RiskAgent::new(gateway.clone(), concurrency),
            next_steps: NextStepsAgent::new(gateway.clone()),
            qa: QaAgent::new(gateway.clone()),
            translator: TranslateAgent::new(gateway.clone()),
            gateway,
        }
    }

    /// Build the gateway described by `config` and wire the agents to it.
    pub fn from_config(config: &RuntimeConfig, registry: &ProviderRegistry) -> Result<Self, RuntimeError> {
        let gateway = config.build_shared_gateway(registry)?;
        Ok(Self::new(gateway, config.fan_out.concurrency))
    }

    pub fn builder() -> AnalysisPipelineBuilder {
        AnalysisPipelineBuilder::new()
    }

    /// Analyze raw document text.
    pub async fn analyze(&self, text: &str) -> AnalysisReport {
        let started = Instant::now();

        let document_info = self.document.structure(text).await;

        let (legal_mapping, simplified, risks) = tokio::join!(
            self.legal.map_laws(&document_info),
            self.simplify.simplify(&document_info),
            self.risk.assess(&document_info),
        );

        let risk_ids = risks.risks.iter().map(|r| r.clause_id.as_str());
        let simplified_ids = simplified.simplified_clauses.iter().map(|s| s.clause_id.as_str());
        if !is_aligned(&document_info, risk_ids) || !is_aligned(&document_info, simplified_ids) {
            tracing::warn!("Per-clause results are not aligned with document clauses");
        }

        let next_steps = self
            .next_steps
            .advise(&document_info, Some(&legal_mapping), Some(&risks))
            .await;

        tracing::info!(
            document_type = %document_info.document_type,
            clauses = document_info.clauses.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        AnalysisReport {
            document_info,
            legal_mapping,
            simplified,
            risks,
            next_steps,
            disclaimer: REPORT_DISCLAIMER.to_string(),
            analyzed_at: Utc::now(),
        }
    }

    /// Answer a question about an already-structured document.
    pub async fn ask(&self, question: &str, doc: &DocumentInfo, language: &str) -> ChatAnswer {
        self.qa.answer(question, doc, language).await
    }

    pub async fn translate(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
    ) -> Result<String, AgentError> {
        self.translator.translate(text, target, source).await
    }

    pub fn gateway(&self) -> &Arc<CompletionGateway> {
        &self.gateway
    }

    /// Model usage since startup.
    pub fn usage(&self) -> LlmUsage {
        self.gateway.usage()
    }
}

impl std::fmt::Debug for AnalysisPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisPipeline")
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Builder for [`AnalysisPipeline`].
///
/// Takes either a ready gateway or a provider; with a provider the gateway
/// is assembled from the builder's config.
pub struct AnalysisPipelineBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    gateway: Option<Arc<CompletionGateway>>,
    config: RuntimeConfig,
}

impl AnalysisPipelineBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            gateway: None,
            config: RuntimeConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn gateway(mut self, gateway: Arc<CompletionGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<AnalysisPipeline, RuntimeError> {
        self.config.validate()?;
        let concurrency = self.config.fan_out.concurrency;

        let gateway = match (self.gateway, self.provider) {
            (Some(gateway), _) => gateway,
            (None, Some(provider)) => Arc::new(self.config.gateway_for(provider)),
            (None, None) => {
                return Err(RuntimeError::ProviderNotConfigured(
                    "No provider or gateway set".to_string(),
                ))
            }
        };

        Ok(AnalysisPipeline::new(gateway, concurrency))
    }
}

impl Default for AnalysisPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
