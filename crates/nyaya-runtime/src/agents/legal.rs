//! Legal mapping agent: one call for the whole document.

use nyaya_core::fallback::law_mapping_fallback;
use nyaya_core::integrity::enforce_law_mapping;
use nyaya_core::responses::LawMappingResponse;
use nyaya_core::{extract::extract, DocumentInfo, LawMapping};
use std::sync::Arc;

use super::{AgentError, AgentKind};
use crate::gateway::{CompletionGateway, CompletionRequest};
use crate::prompts::legal_prompt;

pub struct LegalAgent {
    gateway: Arc<CompletionGateway>,
}

impl LegalAgent {
    pub fn new(gateway: Arc<CompletionGateway>) -> Self {
        Self { gateway }
    }

    /// Map clauses to broadly relevant Indian statutes.
    ///
    /// Any failure yields an empty mapping. Entries naming unknown clauses
    /// are dropped and each clause keeps at most five laws.
    pub async fn map_laws(&self, doc: &DocumentInfo) -> LawMapping {
        if doc.clauses.is_empty() {
            return law_mapping_fallback();
        }

        match self.try_map_laws(doc).await {
            Ok(mapping) => mapping,
            Err(error) => {
                tracing::warn!(agent = %AgentKind::Legal, error = %error, "Law mapping failed, using empty mapping");
                law_mapping_fallback()
            }
        }
    }

    async fn try_map_laws(&self, doc: &DocumentInfo) -> Result<LawMapping, AgentError> {
        let raw = self
            .gateway
            .complete(AgentKind::Legal, CompletionRequest::new(legal_prompt(doc)))
            .await?;
        let object = extract(&raw).ok_or_else(|| AgentError::malformed(&raw))?;
        let (entries, dropped) = LawMappingResponse::from_object(object)?.into_entries();
        let (mapping, report) = enforce_law_mapping(entries, doc);

        if dropped > 0 || !report.is_clean() {
            tracing::warn!(
                agent = %AgentKind::Legal,
                malformed_entries = dropped,
                unknown_clause_ids = ?report.unknown_clause_ids,
                trimmed_laws = report.trimmed_laws,
                "Law mapping repaired"
            );
        }
        Ok(mapping)
    }
}
