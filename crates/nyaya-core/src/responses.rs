//! Typed forms of the structured responses agents ask the model for.
//!
//! Each is decoded from an extracted object only after it passes its
//! schema (see [`crate::schema`]).

use serde::Deserialize;
use serde_json::Value;

use crate::extract::JsonObject;
use crate::schema::{decode_response, ResponseShape, ValidationError};
use crate::types::{ClauseLaws, ClauseRisk, RiskLevel, SimplifiedClause};

/// Risk verdict for one clause.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RiskResponse {
    pub risk_level: RiskLevel,
    pub reason: String,
    pub flags: Vec<String>,
}

impl RiskResponse {
    pub fn from_object(object: JsonObject) -> Result<Self, ValidationError> {
        decode_response(ResponseShape::Risk, object)
    }

    pub fn into_clause_risk(self, clause_id: &str) -> ClauseRisk {
        ClauseRisk {
            clause_id: clause_id.to_string(),
            risk_level: self.risk_level,
            reason: self.reason,
            flags: self.flags,
        }
    }
}

/// Plain-language explanation of one clause.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimplificationResponse {
    pub simple_explanation_en: String,
    pub simple_explanation_hi: String,
    pub why_it_matters: String,
}

impl SimplificationResponse {
    pub fn from_object(object: JsonObject) -> Result<Self, ValidationError> {
        decode_response(ResponseShape::Simplification, object)
    }

    pub fn into_simplified(self, clause_id: &str, original: &str) -> SimplifiedClause {
        SimplifiedClause {
            clause_id: clause_id.to_string(),
            original: original.to_string(),
            simple_explanation_en: self.simple_explanation_en,
            simple_explanation_hi: self.simple_explanation_hi,
            why_it_matters: self.why_it_matters,
        }
    }
}

/// Law mapping for the whole document. Entries are kept raw so that one
/// malformed entry does not discard the others.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LawMappingResponse {
    pub laws: Vec<Value>,
}

impl LawMappingResponse {
    pub fn from_object(object: JsonObject) -> Result<Self, ValidationError> {
        decode_response(ResponseShape::LawMapping, object)
    }

    /// Decode each entry, returning the well-formed ones and the count dropped.
    pub fn into_entries(self) -> (Vec<ClauseLaws>, usize) {
        let total = self.laws.len();
        let entries: Vec<ClauseLaws> = self
            .laws
            .into_iter()
            .filter_map(|entry| {
                let mut entry = entry;
                // Models sometimes emit numeric clause ids
                if let Some(id) = entry.get("clause_id").and_then(Value::as_u64) {
                    entry["clause_id"] = Value::String(id.to_string());
                }
                serde_json::from_value::<ClauseLaws>(entry).ok()
            })
            .collect();
        let dropped = total - entries.len();
        (entries, dropped)
    }
}

/// Informational suggestions. The model's disclaimer is deliberately not read.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NextStepsResponse {
    pub next_steps: Vec<String>,
}

impl NextStepsResponse {
    pub fn from_object(object: JsonObject) -> Result<Self, ValidationError> {
        decode_response(ResponseShape::NextSteps, object)
    }
}
