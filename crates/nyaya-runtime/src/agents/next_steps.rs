//! Next-steps agent: general, non-directive suggestions.

use nyaya_core::fallback::next_steps_fallback;
use nyaya_core::responses::NextStepsResponse;
use nyaya_core::{extract::extract, DocumentInfo, LawMapping, NextSteps, RiskAssessment, DISCLAIMER};
use std::sync::Arc;

use super::{AgentError, AgentKind};
use crate::gateway::{CompletionGateway, CompletionRequest};
use crate::prompts::next_steps_prompt;

pub struct NextStepsAgent {
    gateway: Arc<CompletionGateway>,
}

impl NextStepsAgent {
    pub fn new(gateway: Arc<CompletionGateway>) -> Self {
        Self { gateway }
    }

    /// Suggest next steps. The disclaimer is always the canonical one.
    pub async fn advise(
        &self,
        doc: &DocumentInfo,
        legal_mapping: Option<&LawMapping>,
        risks: Option<&RiskAssessment>,
    ) -> NextSteps {
        let mut steps = match self.try_advise(doc, legal_mapping, risks).await {
            Ok(steps) => steps,
            Err(error) => {
                tracing::warn!(agent = %AgentKind::NextSteps, error = %error, "Next steps failed, using defaults");
                next_steps_fallback()
            }
        };
        steps.disclaimer = DISCLAIMER.to_string();
        steps
    }

    async fn try_advise(
        &self,
        doc: &DocumentInfo,
        legal_mapping: Option<&LawMapping>,
        risks: Option<&RiskAssessment>,
    ) -> Result<NextSteps, AgentError> {
        let laws = legal_mapping.map(|m| m.laws.as_slice()).unwrap_or_default();
        let risks = risks.map(|r| r.risks.as_slice()).unwrap_or_default();
        let prompt = next_steps_prompt(doc, laws, risks);

        let raw = self
            .gateway
            .complete(AgentKind::NextSteps, CompletionRequest::new(prompt))
            .await?;
        let object = extract(&raw).ok_or_else(|| AgentError::malformed(&raw))?;
        let response = NextStepsResponse::from_object(object)?;

        Ok(NextSteps {
            next_steps: response.next_steps,
            disclaimer: String::new(),
        })
    }
}
