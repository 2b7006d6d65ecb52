//! Risk agent: one classification call per clause.

use async_trait::async_trait;
use nyaya_core::fallback::risk_fallback;
use nyaya_core::responses::RiskResponse;
use nyaya_core::{extract::extract, Clause, ClauseRisk, DocumentInfo, RiskAssessment};
use std::sync::Arc;

use super::{fan_out, AgentError, AgentKind, ClauseAgent};
use crate::gateway::{CompletionGateway, CompletionRequest};
use crate::prompts::risk_prompt;

pub struct RiskAgent {
    gateway: Arc<CompletionGateway>,
    concurrency: usize,
}

impl RiskAgent {
    pub fn new(gateway: Arc<CompletionGateway>, concurrency: usize) -> Self {
        Self {
            gateway,
            concurrency,
        }
    }

    /// One risk entry per clause, in clause order.
    pub async fn assess(&self, doc: &DocumentInfo) -> RiskAssessment {
        RiskAssessment {
            risks: fan_out(self, &doc.clauses, self.concurrency).await,
        }
    }
}

#[async_trait]
impl ClauseAgent for RiskAgent {
    type Output = ClauseRisk;

    fn kind(&self) -> AgentKind {
        AgentKind::Risk
    }

    async fn analyze_clause(&self, clause: &Clause) -> Result<ClauseRisk, AgentError> {
        let raw = self
            .gateway
            .complete(AgentKind::Risk, CompletionRequest::new(risk_prompt(&clause.text)))
            .await?;
        let object = extract(&raw).ok_or_else(|| AgentError::malformed(&raw))?;
        Ok(RiskResponse::from_object(object)?.into_clause_risk(&clause.id))
    }

    fn fallback(&self, clause: &Clause) -> ClauseRisk {
        risk_fallback(&clause.id)
    }
}
