//! Substitute values returned when a model call or its parse fails.
//!
//! Every agent has exactly one fallback; the pipeline as a whole never
//! aborts because one model response was unusable.

use crate::text::truncate_chars;
use crate::types::{
    Clause, ClauseRisk, DocumentInfo, Language, LawMapping, NextSteps, RiskLevel, SimplifiedClause,
};

/// The canonical next-steps disclaimer. Always overwrites whatever the model wrote.
pub const DISCLAIMER: &str = "This tool provides informational assistance only and is not a substitute \
for professional legal advice. For any important decision, please consult \
a qualified legal professional.";

/// Title of the synthetic clause covering the whole input.
pub const FULL_DOCUMENT_TITLE: &str = "Full document";

/// Maximum characters of raw model output kept as the fallback summary.
pub const FALLBACK_SUMMARY_CHARS: usize = 1000;

pub const RISK_FALLBACK_REASON: &str = "Automatic analysis failed; no specific risks identified.";

pub const SIMPLIFY_FALLBACK_EN: &str = "Could not simplify automatically.";

pub const DEFAULT_NEXT_STEPS: [&str; 3] = [
    "Read the full document carefully and make sure you understand each clause.",
    "If you feel unsure about any clause, especially high-risk ones, consider talking to a qualified lawyer.",
    "Keep copies of important communications and signed documents for your records.",
];

/// One clause holding the entire document verbatim.
pub fn full_document_clause(text: &str) -> Clause {
    Clause::new("clause_1", FULL_DOCUMENT_TITLE, text)
}

/// Document record used when the model output cannot be structured.
pub fn document_fallback(text: &str, raw_output: &str) -> DocumentInfo {
    DocumentInfo {
        clauses: vec![full_document_clause(text)],
        summary: truncate_chars(raw_output.trim(), FALLBACK_SUMMARY_CHARS).to_string(),
        ..Default::default()
    }
}

pub fn law_mapping_fallback() -> LawMapping {
    LawMapping::default()
}

pub fn risk_fallback(clause_id: &str) -> ClauseRisk {
    ClauseRisk {
        clause_id: clause_id.to_string(),
        risk_level: RiskLevel::Low,
        reason: RISK_FALLBACK_REASON.to_string(),
        flags: Vec::new(),
    }
}

pub fn simplified_fallback(clause_id: &str, original: &str) -> SimplifiedClause {
    SimplifiedClause {
        clause_id: clause_id.to_string(),
        original: original.to_string(),
        simple_explanation_en: SIMPLIFY_FALLBACK_EN.to_string(),
        simple_explanation_hi: String::new(),
        why_it_matters: String::new(),
    }
}

pub fn next_steps_fallback() -> NextSteps {
    NextSteps {
        next_steps: DEFAULT_NEXT_STEPS.iter().map(|s| s.to_string()).collect(),
        disclaimer: DISCLAIMER.to_string(),
    }
}

/// Apology returned in place of a chat answer when the model call fails.
pub fn apology(language: Language) -> &'static str {
    match language {
        Language::En => {
            "I apologize, but I encountered an error processing your question. Please try again."
        }
        Language::Hi => {
            "मुझे खेद है, लेकिन आपके प्रश्न को संसाधित करते समय एक त्रुटि हुई। कृपया पुनः प्रयास करें।"
        }
        Language::Te => {
            "క్షమించండి, కానీ మీ ప్రశ్నను ప్రాసెస్ చేయడంలో లోపం సంభవించింది. దయచేసి మళ్లీ ప్రయత్నించండి."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_fallback_keeps_input_verbatim() {
        let text = "Tenant shall pay ₹10,000 monthly rent by the 5th.";
        let doc = document_fallback(text, "   not json   ");
        assert_eq!(doc.clauses.len(), 1);
        assert_eq!(doc.clauses[0].text, text);
        assert_eq!(doc.clauses[0].title, FULL_DOCUMENT_TITLE);
        assert_eq!(doc.summary, "not json");
        assert_eq!(doc.document_type, "");
        assert!(doc.parties.is_empty());
    }

    #[test]
    fn test_fallback_summary_is_bounded() {
        let raw = "x".repeat(5000);
        let doc = document_fallback("text", &raw);
        assert_eq!(doc.summary.chars().count(), FALLBACK_SUMMARY_CHARS);
    }

    #[test]
    fn test_whitespace_input_yields_empty_summary() {
        let doc = document_fallback("   ", "");
        assert_eq!(doc.summary, "");
        assert_eq!(doc.clauses[0].text, "   ");
    }

    #[test]
    fn test_next_steps_fallback_has_disclaimer() {
        let steps = next_steps_fallback();
        assert_eq!(steps.next_steps.len(), 3);
        assert_eq!(steps.disclaimer, DISCLAIMER);
    }

    #[test]
    fn test_apology_is_localized() {
        assert!(apology(Language::En).starts_with("I apologize"));
        assert_ne!(apology(Language::Hi), apology(Language::Te));
    }
}
