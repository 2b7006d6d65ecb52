//! # nyaya-core
//!
//! Data model and defensive response handling for Nyaya, an assistant
//! that explains Indian legal documents.
//!
//! This crate never calls a model. It holds everything the agents need to
//! turn unreliable model text into typed records:
//!
//! - [`types`]: the records passed through the pipeline
//! - [`extract`]: recovering a JSON object from free text
//! - [`schema`] and [`responses`]: validating and decoding response shapes
//! - [`normalize`]: lenient construction of [`DocumentInfo`]
//! - [`integrity`]: clause-id referential integrity
//! - [`fallback`]: the substitute value for every failure
//!
//! ## Example
//!
//! ```rust
//! use nyaya_core::{extract, responses::RiskResponse, RiskLevel};
//!
//! let raw = "```json\n{\"risk_level\": \"High\", \"reason\": \"2% daily penalty\", \"flags\": [\"excessive penalty\"]}\n```";
//! let object = extract::extract(raw).expect("object");
//! let risk = RiskResponse::from_object(object).expect("valid").into_clause_risk("clause_1");
//! assert_eq!(risk.risk_level, RiskLevel::High);
//! ```

pub mod extract;
pub mod fallback;
pub mod integrity;
pub mod normalize;
pub mod responses;
pub mod schema;
pub mod text;
pub mod types;

// Re-export main types at crate root
pub use extract::{extract_shaped, JsonObject, Shape};
pub use fallback::DISCLAIMER;
pub use schema::{ResponseShape, ValidationError};
pub use types::{
    AnalysisReport, ChatAnswer, Clause, ClauseLaws, ClauseRisk, DocumentDates, DocumentInfo,
    Language, LawMapping, NextSteps, Party, RelatedLaw, RiskAssessment, RiskLevel, Simplification,
    SimplifiedClause, UnsupportedLanguage, REPORT_DISCLAIMER,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_output_to_document() {
        let raw = r#"Here is the structured document:
```json
{
  "document_type": "rental_agreement",
  "parties": [{"name": "", "role": "tenant"}],
  "dates": {"start_date": "", "end_date": "", "signature_date": ""},
  "clauses": [{
    "id": "clause_1",
    "title": "Rent and late payment",
    "text": "Tenant shall pay ₹10,000 monthly rent by the 5th. Late payment incurs 2% daily penalty.",
    "obligations": ["Tenant must pay ₹10,000 rent by the 5th of each month"],
    "penalties": ["Late payment is charged 2% per day"]
  }],
  "summary": "A rental agreement with a daily late fee."
}
```"#;
        let object = extract_shaped(raw, &normalize::DOCUMENT_SHAPE).unwrap();
        let doc = normalize::normalize_document(&object, "");
        assert_eq!(doc.document_type, "rental_agreement");
        assert_eq!(doc.clauses.len(), 1);
        assert_eq!(doc.clauses[0].penalties.len(), 1);
        assert_eq!(doc.parties[0].role, "tenant");
    }
}
