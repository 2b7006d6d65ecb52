//! Simplification agent: one explanation call per clause.

use async_trait::async_trait;
use nyaya_core::fallback::simplified_fallback;
use nyaya_core::responses::SimplificationResponse;
use nyaya_core::{extract::extract, Clause, DocumentInfo, Simplification, SimplifiedClause};
use std::sync::Arc;

use super::{fan_out, AgentError, AgentKind, ClauseAgent};
use crate::gateway::{CompletionGateway, CompletionRequest};
use crate::prompts::simplify_prompt;

pub struct SimplifyAgent {
    gateway: Arc<CompletionGateway>,
    concurrency: usize,
}

impl SimplifyAgent {
    pub fn new(gateway: Arc<CompletionGateway>, concurrency: usize) -> Self {
        Self {
            gateway,
            concurrency,
        }
    }

    /// One explanation per clause, in clause order.
    pub async fn simplify(&self, doc: &DocumentInfo) -> Simplification {
        Simplification {
            simplified_clauses: fan_out(self, &doc.clauses, self.concurrency).await,
        }
    }
}

#[async_trait]
impl ClauseAgent for SimplifyAgent {
    type Output = SimplifiedClause;

    fn kind(&self) -> AgentKind {
        AgentKind::Simplify
    }

    async fn analyze_clause(&self, clause: &Clause) -> Result<SimplifiedClause, AgentError> {
        let raw = self
            .gateway
            .complete(AgentKind::Simplify, CompletionRequest::new(simplify_prompt(&clause.text)))
            .await?;
        let object = extract(&raw).ok_or_else(|| AgentError::malformed(&raw))?;
        Ok(SimplificationResponse::from_object(object)?.into_simplified(&clause.id, &clause.text))
    }

    fn fallback(&self, clause: &Clause) -> SimplifiedClause {
        simplified_fallback(&clause.id, &clause.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::test_support::*;
    use nyaya_core::fallback::SIMPLIFY_FALLBACK_EN;

    fn doc() -> DocumentInfo {
        DocumentInfo {
            clauses: vec![
                Clause::new("clause_1", "Rent", "The Lessee shall remit the monthly rental."),
                Clause::new("clause_2", "Indemnity", "The Lessee shall indemnify the Lessor."),
                Clause::new("clause_3", "Jurisdiction", "Courts at Hyderabad have jurisdiction."),
            ],
            ..Default::default()
        }
    }

    fn by_clause_text() -> ScriptedProvider {
        ScriptedProvider::new(|messages| {
            let prompt = prompt_of(messages);
            if prompt.contains("indemnify") {
                // Missing why_it_matters
                Ok(r#"{"simple_explanation_en": "You cover their losses.", "simple_explanation_hi": "Aap nuksaan bharenge."}"#.to_string())
            } else if prompt.contains("Hyderabad") {
                Err(crate::providers::ProviderError::Timeout(std::time::Duration::from_secs(1)))
            } else {
                Ok(r#"{"simple_explanation_en": "You pay rent every month.", "simple_explanation_hi": "Aapko har mahine kiraya dena hoga.", "why_it_matters": "Missing rent can end the lease."}"#.to_string())
            }
        })
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_alignment() {
        let agent = SimplifyAgent::new(gateway(Arc::new(by_clause_text())), 4);
        let doc = doc();

        let result = agent.simplify(&doc).await;

        assert_eq!(result.simplified_clauses.len(), 3);
        for (clause, simplified) in doc.clauses.iter().zip(&result.simplified_clauses) {
            assert_eq!(simplified.clause_id, clause.id);
            assert_eq!(simplified.original, clause.text);
        }

        assert_eq!(result.simplified_clauses[0].simple_explanation_en, "You pay rent every month.");
        assert_eq!(result.simplified_clauses[0].why_it_matters, "Missing rent can end the lease.");

        for failed in &result.simplified_clauses[1..] {
            assert_eq!(failed.simple_explanation_en, SIMPLIFY_FALLBACK_EN);
            assert_eq!(failed.simple_explanation_hi, "");
            assert_eq!(failed.why_it_matters, "");
        }
    }

    #[tokio::test]
    async fn test_empty_document() {
        let provider = Arc::new(by_clause_text());
        let agent = SimplifyAgent::new(gateway(provider.clone()), 4);

        assert!(agent.simplify(&DocumentInfo::default()).await.simplified_clauses.is_empty());
        assert_eq!(provider.call_count(), 0);
    }
}
