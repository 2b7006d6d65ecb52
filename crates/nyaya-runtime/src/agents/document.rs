//! Document structuring agent.

use nyaya_core::fallback::document_fallback;
use nyaya_core::normalize::{normalize_document, DOCUMENT_SHAPE};
use nyaya_core::{extract_shaped, DocumentInfo};
use std::sync::Arc;

use super::{AgentError, AgentKind};
use crate::gateway::{CompletionGateway, CompletionRequest};
use crate::prompts::{document_prompt, DOCUMENT_SYSTEM_PROMPT};

/// Turns raw document text into a [`DocumentInfo`].
pub struct DocumentAgent {
    gateway: Arc<CompletionGateway>,
}

impl DocumentAgent {
    pub fn new(gateway: Arc<CompletionGateway>) -> Self {
        Self { gateway }
    }

    /// Structure `text`. Never fails.
    ///
    /// Input that is empty after trimming is not sent to the model. When
    /// the model call fails or its output holds no document record, the
    /// result is a single "Full document" clause holding `text`, with the
    /// first 1000 characters of the raw output (if any) as summary.
    pub async fn structure(&self, text: &str) -> DocumentInfo {
        if text.trim().is_empty() {
            tracing::warn!(agent = %AgentKind::Document, "Empty document text, using fallback");
            return document_fallback(text, "");
        }

        let request = CompletionRequest::new(document_prompt(text)).with_system(DOCUMENT_SYSTEM_PROMPT);
        let raw = match self.gateway.complete(AgentKind::Document, request).await {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(agent = %AgentKind::Document, error = %error, "Structuring failed, using fallback");
                return document_fallback(text, "");
            }
        };

        match parse_document(&raw, text) {
            Ok(doc) => {
                tracing::debug!(
                    agent = %AgentKind::Document,
                    document_type = %doc.document_type,
                    clauses = doc.clauses.len(),
                    "Document structured"
                );
                doc
            }
            Err(error) => {
                tracing::warn!(agent = %AgentKind::Document, error = %error, "Unusable structuring output, using fallback");
                document_fallback(text, &raw)
            }
        }
    }
}

fn parse_document(raw: &str, text: &str) -> Result<DocumentInfo, AgentError> {
    let object = extract_shaped(raw, &DOCUMENT_SHAPE).ok_or_else(|| AgentError::malformed(raw))?;
    if !DOCUMENT_SHAPE.keys.iter().any(|key| object.contains_key(*key)) {
        return Err(AgentError::malformed(raw));
    }
    Ok(normalize_document(&object, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::test_support::*;
    use nyaya_core::fallback::FULL_DOCUMENT_TITLE;
    use serde_json::json;

    const LEASE: &str = "Tenant shall pay ₹10,000 monthly rent by the 5th. Late payment incurs 2% daily penalty.";

    fn lease_record() -> serde_json::Value {
        json!({
            "document_type": "rental_agreement",
            "parties": [{"name": "", "role": "tenant"}, {"name": "", "role": "landlord"}],
            "dates": {"start_date": "", "end_date": "", "signature_date": ""},
            "clauses": [{
                "id": "clause_1",
                "title": "Rent and late payment",
                "text": LEASE,
                "obligations": ["Tenant must pay ₹10,000 rent by the 5th of each month"],
                "penalties": ["Late payment is charged 2% per day"]
            }],
            "summary": "A rental agreement with a daily late-payment penalty."
        })
    }

    #[tokio::test]
    async fn test_structures_lease() {
        let raw = format!("```json\n{}\n```", lease_record());
        let provider = Arc::new(ScriptedProvider::new(move |_| Ok(raw.clone())));
        let agent = DocumentAgent::new(gateway(provider.clone()));

        let doc = agent.structure(LEASE).await;

        assert_eq!(doc.document_type, "rental_agreement");
        assert_eq!(doc.clauses.len(), 1);
        assert_eq!(doc.clauses[0].penalties, vec!["Late payment is charged 2% per day"]);

        let calls = provider.calls();
        assert_eq!(system_of(&calls[0]), DOCUMENT_SYSTEM_PROMPT);
        assert!(prompt_of(&calls[0]).contains(LEASE));
    }

    #[tokio::test]
    async fn test_prefers_inner_duplicate_in_summary() {
        let outer = json!({
            "document_type": "",
            "parties": [],
            "dates": {},
            "clauses": [],
            "summary": format!("```json\n{}\n```", lease_record())
        });
        let raw = outer.to_string();
        let agent = DocumentAgent::new(gateway(Arc::new(ScriptedProvider::new(move |_| Ok(raw.clone())))));

        let doc = agent.structure(LEASE).await;

        assert_eq!(doc.document_type, "rental_agreement");
        assert_eq!(doc.clauses[0].title, "Rent and late payment");
    }

    #[tokio::test]
    async fn test_unparseable_output_falls_back() {
        let agent = DocumentAgent::new(gateway(Arc::new(ScriptedProvider::constant(
            "Sorry, I cannot help with that document.",
        ))));

        let doc = agent.structure(LEASE).await;

        assert_eq!(doc.document_type, "");
        assert!(doc.parties.is_empty());
        assert_eq!(doc.clauses.len(), 1);
        assert_eq!(doc.clauses[0].title, FULL_DOCUMENT_TITLE);
        assert_eq!(doc.clauses[0].text, LEASE);
        assert_eq!(doc.summary, "Sorry, I cannot help with that document.");
    }

    #[tokio::test]
    async fn test_summary_truncated_to_raw_prefix() {
        let agent = DocumentAgent::new(gateway(Arc::new(ScriptedProvider::new(|_| Ok("z".repeat(2500))))));

        let doc = agent.structure(LEASE).await;

        assert_eq!(doc.summary.chars().count(), 1000);
    }

    #[tokio::test]
    async fn test_unrelated_object_falls_back() {
        let agent = DocumentAgent::new(gateway(Arc::new(ScriptedProvider::constant(
            r#"{"answer": "This is a lease."}"#,
        ))));

        let doc = agent.structure(LEASE).await;

        assert_eq!(doc.clauses[0].title, FULL_DOCUMENT_TITLE);
        assert_eq!(doc.summary, r#"{"answer": "This is a lease."}"#);
    }

    #[tokio::test]
    async fn test_gateway_failure_falls_back() {
        let agent = DocumentAgent::new(gateway(Arc::new(ScriptedProvider::failing())));

        let doc = agent.structure(LEASE).await;

        assert_eq!(doc.clauses[0].text, LEASE);
        assert_eq!(doc.summary, "");
    }

    #[tokio::test]
    async fn test_blank_input_skips_model() {
        for input in ["", "   \n\t "] {
            let provider = Arc::new(ScriptedProvider::constant("{}"));
            let agent = DocumentAgent::new(gateway(provider.clone()));

            let doc = agent.structure(input).await;

            assert_eq!(provider.call_count(), 0);
            assert_eq!(doc.summary, "");
            assert_eq!(doc.clauses.len(), 1);
            assert_eq!(doc.clauses[0].text, input);
        }
    }

    #[tokio::test]
    async fn test_duplicate_clause_ids_are_made_unique() {
        let record = json!({
            "document_type": "employment_offer",
            "clauses": [
                {"id": "clause_1", "title": "Salary", "text": "₹50,000 per month"},
                {"id": "clause_1", "title": "Probation", "text": "Six months"},
                {"title": "Notice", "text": "Two months notice"}
            ]
        });
        let raw = record.to_string();
        let agent = DocumentAgent::new(gateway(Arc::new(ScriptedProvider::new(move |_| Ok(raw.clone())))));

        let doc = agent.structure("offer letter").await;

        let ids: Vec<&str> = doc.clauses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["clause_1", "clause_2", "clause_3"]);
    }
}
